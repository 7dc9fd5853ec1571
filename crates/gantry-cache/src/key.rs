//! Content-derived cache keys.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A cache key derived from stable content fingerprints.
///
/// Identical inputs always produce identical keys; the engine relies on this
/// for correctness, not just speed. Keys are hex-encoded SHA-256 digests and
/// are safe to use directly as file names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive a key from a toolchain fingerprint and a lockfile fingerprint.
    ///
    /// Inputs are length-prefixed before hashing so that no two distinct
    /// input pairs can collide by concatenation.
    pub fn derive(toolchain_fingerprint: &str, lockfile_fingerprint: &str) -> Self {
        let mut hasher = Sha256::new();
        for part in [toolchain_fingerprint, lockfile_fingerprint] {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hex-encoded SHA-256 of raw content, used to fingerprint lockfiles.
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
