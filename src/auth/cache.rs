//! Salted-password memoization
//!
//! PBKDF2 at 4096+ iterations dominates the cost of an authentication
//! attempt. Results are keyed by the prepped password representation, the
//! salt, and the iteration count, so repeated attempts for the same user
//! against the same server derive once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use once_cell::sync::Lazy;

use super::ScramVersion;
use crate::crypto;

/// Upper bound on cached entries; inserting past it purges the whole map.
const MAX_ENTRIES: usize = 200;

/// Process-wide cache shared by every conversation.
pub(crate) static SALTED_PASSWORD_CACHE: Lazy<SaltedPasswordCache> =
    Lazy::new(SaltedPasswordCache::new);

#[derive(Hash, PartialEq, Eq)]
struct CacheKey {
    /// Already-prepped password representation (MD5 hex for SHA-1, SASLprep
    /// output for SHA-256), so the two hash families never share an entry.
    password: Vec<u8>,
    /// Base64 of the server-provided salt.
    salt: String,
    iterations: u32,
}

/// Memoizes `Hi(password, salt, iterations)` results.
pub(crate) struct SaltedPasswordCache {
    entries: RwLock<HashMap<CacheKey, Vec<u8>>>,
    computes: AtomicU64,
}

impl SaltedPasswordCache {
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            computes: AtomicU64::new(0),
        }
    }

    /// Look up the salted password, running PBKDF2 on a miss.
    ///
    /// The derivation runs outside any lock; two racing callers may both
    /// compute, and both arrive at the same bytes.
    pub(crate) fn get_or_compute(
        &self,
        version: ScramVersion,
        password: &[u8],
        salt: &[u8],
        iterations: u32,
    ) -> Vec<u8> {
        let key = CacheKey {
            password: password.to_vec(),
            salt: BASE64.encode(salt),
            iterations,
        };

        if let Ok(entries) = self.entries.read() {
            if let Some(salted) = entries.get(&key) {
                return salted.clone();
            }
        }

        let salted = crypto::h_i(version, password, salt, iterations);
        let computes = self.computes.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(computes, iterations, "derived salted password");

        if let Ok(mut entries) = self.entries.write() {
            if entries.len() >= MAX_ENTRIES {
                entries.clear();
            }
            entries.entry(key).or_insert_with(|| salted.clone());
        }

        salted
    }

    /// Number of PBKDF2 derivations this cache has performed.
    #[cfg(test)]
    fn computes(&self) -> u64 {
        self.computes.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }
}
