//! Session identifier generation and storage key derivation
//!
//! The client only ever sees the random identifier. Stores are indexed by
//! `SHA-256(id ‖ secret)`, so a leaked cookie value cannot be turned into a
//! store key and a store dump cannot be replayed as cookies.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// Default number of random bytes per identifier
pub const DEFAULT_ENTROPY: usize = 32;

/// Generate a URL-safe identifier from `entropy` bytes of OS randomness
///
/// # Panics
///
/// Panics if the operating system random source fails. Continuing without it
/// would hand out predictable identifiers.
pub fn generate_id(entropy: usize) -> String {
    let mut buf = vec![0u8; entropy];
    if let Err(err) = OsRng.try_fill_bytes(&mut buf) {
        panic!("session: secure random source unavailable: {}", err);
    }
    URL_SAFE_NO_PAD.encode(&buf)
}

/// Derive the storage key for a client-visible identifier
pub fn hash_id(id: &str, secret: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hasher.update(secret);
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Identifier codec bound to one configuration
#[derive(Clone)]
pub struct IdCodec {
    entropy: usize,
    secret: Arc<[u8]>,
    hash: bool,
}

impl IdCodec {
    /// Create a codec; `entropy == 0` falls back to [`DEFAULT_ENTROPY`]
    pub fn new(entropy: usize, secret: impl Into<Vec<u8>>, hash: bool) -> Self {
        let entropy = if entropy == 0 { DEFAULT_ENTROPY } else { entropy };
        Self { entropy, secret: Arc::from(secret.into()), hash }
    }

    /// Generate a fresh client-visible identifier
    pub fn generate(&self) -> String {
        generate_id(self.entropy)
    }

    /// Storage key for `id`; the id itself when hashing is disabled
    pub fn storage_key(&self, id: &str) -> String {
        if self.hash {
            hash_id(id, &self.secret)
        } else {
            id.to_string()
        }
    }

    pub fn entropy(&self) -> usize {
        self.entropy
    }

    pub fn hashes_ids(&self) -> bool {
        self.hash
    }
}

impl fmt::Debug for IdCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdCodec")
            .field("entropy", &self.entropy)
            .field("secret", &"<redacted>")
            .field("hash", &self.hash)
            .finish()
    }
}
