//! Password preparation
//!
//! SCRAM-SHA-1 uses MongoDB's legacy password digest: the lowercase hex of
//! `MD5("<username>:mongo:<password>")`. SCRAM-SHA-256 normalizes the
//! password with SASLprep (RFC 4013) instead.

use std::sync::Once;

use md5::{Digest, Md5};
use stringprep::saslprep;

use super::ScramVersion;
use crate::{Error, Result};

static SASLPREP_FALLBACK_WARNING: Once = Once::new();

/// Prepare a password for key derivation, returning the byte representation
/// that PBKDF2 consumes.
pub(crate) fn prepare(
    version: ScramVersion,
    username: &str,
    password: &str,
) -> Result<Vec<u8>> {
    match version {
        ScramVersion::Sha1 => {
            if password.is_empty() {
                return Err(Error::InvalidInput("password must not be empty".into()));
            }
            let mut md5 = Md5::new();
            md5.update(username.as_bytes());
            md5.update(b":mongo:");
            md5.update(password.as_bytes());
            Ok(hex::encode(md5.finalize()).into_bytes())
        }
        ScramVersion::Sha256 => match saslprep(password) {
            Ok(prepped) => Ok(prepped.into_owned().into_bytes()),
            Err(_) => {
                SASLPREP_FALLBACK_WARNING.call_once(|| {
                    tracing::warn!(
                        "SASLprep rejected the password; falling back to raw UTF-8 bytes for \
                         SCRAM-SHA-256"
                    );
                });
                Ok(password.as_bytes().to_vec())
            }
        },
    }
}
