//! # Address Codec
//!
//! Mesh destinations are addressed by a truncated hash. At the HTTP boundary
//! they travel as hex text; internally they are fixed-size byte arrays.

use crate::errors::AddressError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Length in bytes of a truncated destination hash (128 bits).
pub const TRUNCATED_HASH_LENGTH: usize = 16;

/// A validated mesh destination address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; TRUNCATED_HASH_LENGTH]);

impl Address {
    /// Wrap raw bytes that are already known to be a destination hash.
    pub const fn from_bytes(bytes: [u8; TRUNCATED_HASH_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parse an external address token.
    ///
    /// Surrounding whitespace is ignored. Anything that is not hex is an
    /// [`AddressError::InvalidFormat`]; well-formed hex of the wrong size is an
    /// [`AddressError::InvalidLength`].
    pub fn from_hex(token: &str) -> Result<Self, AddressError> {
        let bytes = hex::decode(token.trim()).map_err(|e| AddressError::InvalidFormat {
            reason: e.to_string(),
        })?;

        let array: [u8; TRUNCATED_HASH_LENGTH] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| AddressError::InvalidLength {
                    expected: TRUNCATED_HASH_LENGTH,
                    actual: bytes.len(),
                })?;

        Ok(Self(array))
    }

    /// Lowercase hex without delimiters, the form accepted by [`Address::from_hex`].
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Hex wrapped in angle brackets, used in log lines.
    pub fn pretty(&self) -> String {
        format!("<{}>", self.to_hex())
    }

    pub fn as_bytes(&self) -> &[u8; TRUNCATED_HASH_LENGTH] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        Address::from_hex(&token).map_err(serde::de::Error::custom)
    }
}
