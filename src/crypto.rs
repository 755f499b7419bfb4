//! Cryptographic primitives shared by both SCRAM hash families
//!
//! Everything here operates on bytes; text is UTF-8-encoded at the call
//! sites. The functions are parameterized by [`ScramVersion`] so the
//! conversation engine stays generic over SHA-1 and SHA-256.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::auth::ScramVersion;
use crate::{Error, Result};

/// Number of random bytes behind a client nonce.
pub(crate) const NONCE_LENGTH: usize = 24;

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// The `H` function of RFC 5802: 20 bytes for SHA-1, 32 for SHA-256.
pub(crate) fn hash(version: ScramVersion, data: &[u8]) -> Vec<u8> {
    match version {
        ScramVersion::Sha1 => Sha1::digest(data).to_vec(),
        ScramVersion::Sha256 => Sha256::digest(data).to_vec(),
    }
}

/// The `HMAC` function of RFC 5802.
pub(crate) fn hmac(version: ScramVersion, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    match version {
        ScramVersion::Sha1 => mac::<HmacSha1>(key, data),
        ScramVersion::Sha256 => mac::<HmacSha256>(key, data),
    }
}

fn mac<M: Mac + KeyInit>(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = <M as Mac>::new_from_slice(key)
        .map_err(|_| Error::InvalidInput("HMAC key has an invalid length".into()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// The `Hi` function of RFC 5802: PBKDF2 with dkLen equal to the hash
/// output length.
pub(crate) fn h_i(
    version: ScramVersion,
    password: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Vec<u8> {
    let mut salted = vec![0u8; version.hash_len()];
    match version {
        ScramVersion::Sha1 => {
            let _ = pbkdf2::pbkdf2::<HmacSha1>(password, salt, iterations, &mut salted);
        }
        ScramVersion::Sha256 => {
            let _ = pbkdf2::pbkdf2::<HmacSha256>(password, salt, iterations, &mut salted);
        }
    }
    salted
}

/// Generate a client nonce: 24 cryptographically secure random bytes,
/// base64-encoded for transmission.
pub(crate) fn generate_nonce() -> Result<String> {
    let mut bytes = [0u8; NONCE_LENGTH];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|_| Error::RandomnessUnavailable)?;
    Ok(BASE64.encode(bytes))
}

/// Byte-wise XOR of two equal-length slices.
///
/// Both inputs are HMAC outputs of the same hash family; unequal lengths are
/// a programmer error.
pub(crate) fn xor(lhs: &[u8], rhs: &[u8]) -> Vec<u8> {
    assert_eq!(lhs.len(), rhs.len());
    lhs.iter().zip(rhs.iter()).map(|(l, r)| l ^ r).collect()
}

/// Constant-time comparison to prevent timing attacks.
///
/// Returns false immediately if the lengths differ; otherwise the running
/// time depends only on the length. Mandatory for the server-signature
/// check.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
