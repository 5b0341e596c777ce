//! # Error Types
//!
//! Errors raised while decoding values at the system boundary.

use thiserror::Error;

/// Errors produced by the address codec.
///
/// Both variants are user input errors: they are reported to the caller and
/// never abort a send pipeline further than the request that caused them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The token is not valid hexadecimal.
    #[error("invalid destination hash: {reason}")]
    InvalidFormat { reason: String },

    /// The token decoded to the wrong number of bytes.
    #[error("invalid destination hash length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
