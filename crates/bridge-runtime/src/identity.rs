//! Local identity bootstrap.
//!
//! The identity file holds 64 bytes of secret material, generated once and
//! reused on every later start so the bridge keeps its address. Public
//! material is derived per 32-byte half; the address is the first 16 bytes
//! of its SHA-256.

use anyhow::{anyhow, Context, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use shared_types::{Address, Identity, TRUNCATED_HASH_LENGTH};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Bytes of secret material in the identity file.
pub const SECRET_LENGTH: usize = 64;

/// The bridge's own identity.
pub struct LocalIdentity {
    secret: [u8; SECRET_LENGTH],
    public: [u8; 64],
    address: Address,
}

impl LocalIdentity {
    /// Generate fresh identity material.
    pub fn generate() -> Self {
        let mut secret = [0u8; SECRET_LENGTH];
        OsRng.fill_bytes(&mut secret);
        Self::from_secret(secret)
    }

    pub fn from_secret(secret: [u8; SECRET_LENGTH]) -> Self {
        let mut public = [0u8; 64];
        public[..32].copy_from_slice(&Sha256::digest(&secret[..32]));
        public[32..].copy_from_slice(&Sha256::digest(&secret[32..]));

        let digest = Sha256::digest(public);
        let mut truncated = [0u8; TRUNCATED_HASH_LENGTH];
        truncated.copy_from_slice(&digest[..TRUNCATED_HASH_LENGTH]);

        Self {
            secret,
            public,
            address: Address::from_bytes(truncated),
        }
    }

    /// Load the identity at `path`, creating it on first run.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let bytes = fs::read(path)
                .with_context(|| format!("reading identity from {}", path.display()))?;
            let secret: [u8; SECRET_LENGTH] = bytes.as_slice().try_into().map_err(|_| {
                anyhow!(
                    "identity file {} holds {} bytes, expected {}",
                    path.display(),
                    bytes.len(),
                    SECRET_LENGTH
                )
            })?;
            let identity = Self::from_secret(secret);
            info!(address = %identity.address.pretty(), "Loaded identity");
            return Ok(identity);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let identity = Self::generate();
        identity.save(path)?;
        info!(
            address = %identity.address.pretty(),
            path = %path.display(),
            "Created new identity"
        );
        Ok(identity)
    }

    fn save(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("tmp");
        let mut file =
            fs::File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
        file.write_all(&self.secret)?;
        file.sync_all()?;
        fs::rename(&tmp, path).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Public half, as a peer would recall it.
    pub fn public_identity(&self) -> Identity {
        Identity::new(self.public.to_vec())
    }

    pub fn public_hex(&self) -> String {
        hex::encode(self.public)
    }
}

impl std::fmt::Debug for LocalIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalIdentity")
            .field("address", &self.address.pretty())
            .finish_non_exhaustive()
    }
}
