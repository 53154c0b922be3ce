//! Token signing key

use rand::RngCore;
use thiserror::Error;
use zeroize::Zeroizing;

/// Length of a generated key in bytes
pub const GENERATED_KEY_LEN: usize = 64;

/// Shortest accepted configured key in bytes
pub const MIN_KEY_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("Token secret is not valid hex")]
    NotHex,

    #[error("Token secret must be at least 32 bytes, got {0}")]
    TooShort(usize),
}

/// HMAC secret shared by signing and verification
///
/// Immutable after creation, wiped on drop.
pub struct SigningKey {
    bytes: Zeroizing<Vec<u8>>,
    generated: bool,
}

impl SigningKey {
    /// Random key that lives as long as the process
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new(vec![0u8; GENERATED_KEY_LEN]);
        rand::thread_rng().fill_bytes(&mut bytes);
        Self {
            bytes,
            generated: true,
        }
    }

    /// Key from a hex-encoded secret
    pub fn from_hex(secret: &str) -> Result<Self, KeyError> {
        let bytes = Zeroizing::new(hex::decode(secret.trim()).map_err(|_| KeyError::NotHex)?);
        if bytes.len() < MIN_KEY_LEN {
            return Err(KeyError::TooShort(bytes.len()));
        }
        Ok(Self {
            bytes,
            generated: false,
        })
    }

    /// Configured secret if present, else a fresh process-lifetime key
    pub fn from_config(secret: Option<&str>) -> Result<Self, KeyError> {
        match secret {
            Some(secret) => Self::from_hex(secret),
            None => {
                tracing::warn!(
                    "No token secret configured; using a generated key, tokens will not survive a restart"
                );
                Ok(Self::generate())
            }
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Whether the key was generated at startup rather than configured
    pub fn is_generated(&self) -> bool {
        self.generated
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("len", &self.bytes.len())
            .field("generated", &self.generated)
            .finish()
    }
}
