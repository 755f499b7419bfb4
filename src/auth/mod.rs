//! SCRAM authentication
//!
//! This module handles:
//! * Credential and per-attempt context types
//! * Password preparation (MD5 digest for SHA-1, SASLprep for SHA-256)
//! * SASL message construction and parsing
//! * The conversation state machine
//! * The public prepare/authenticate façade, including speculative
//!   authentication

pub mod attributes;
mod cache;
mod conversation;
mod messages;
mod password;
mod provider;

use std::fmt;

use bson::Document;
use tokio_util::sync::CancellationToken;

pub use provider::ScramAuthenticator;

use crate::{Error, Result};

/// The SCRAM hash families supported by the client.
///
/// The caller selects the mechanism; this crate performs no negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScramVersion {
    /// SCRAM-SHA-1 (RFC 5802), with MongoDB's legacy MD5 password digest.
    Sha1,
    /// SCRAM-SHA-256 (RFC 7677), with SASLprep password normalization.
    Sha256,
}

impl ScramVersion {
    /// The SASL mechanism name sent to the server.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScramVersion::Sha1 => "SCRAM-SHA-1",
            ScramVersion::Sha256 => "SCRAM-SHA-256",
        }
    }

    /// Output width of the underlying hash function, in bytes.
    pub(crate) fn hash_len(&self) -> usize {
        match self {
            ScramVersion::Sha1 => 20,
            ScramVersion::Sha256 => 32,
        }
    }
}

impl fmt::Display for ScramVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication credentials, immutable for the duration of an attempt.
#[derive(Clone)]
pub struct Credential {
    /// The username to authenticate as.
    pub username: String,
    /// The password whose knowledge the exchange proves; never transmitted.
    pub password: String,
    /// The authentication database; resolves to `admin` when unset.
    pub source: Option<String>,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            source: None,
        }
    }

    /// Set the authentication database.
    pub fn auth_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// The authentication database, with the `admin` default applied.
    pub fn resolved_source(&self) -> &str {
        self.source.as_deref().unwrap_or("admin")
    }

    /// Reject credentials that cannot begin an exchange. Runs before any I/O.
    fn validate(&self, version: ScramVersion) -> Result<()> {
        if self.username.is_empty() {
            return Err(Error::InvalidInput("username must not be empty".into()));
        }
        if version == ScramVersion::Sha1 && self.password.is_empty() {
            return Err(Error::InvalidInput("password must not be empty".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&"REDACTED").finish()
    }
}

/// Mutable state for one authentication attempt.
///
/// Owned by the handshake driver. [`ScramAuthenticator::prepare`] fills in
/// the nonce, [`AuthContext::record_handshake_response`] captures the
/// server's speculative reply, and
/// [`ScramAuthenticator::authenticate`] consumes both.
pub struct AuthContext<'conn, S> {
    /// Credentials for this attempt.
    pub credential: Credential,
    /// Connection handle the conversation runs over.
    pub stream: &'conn mut S,
    /// Client nonce (base64 of 24 random bytes), set exactly once per
    /// attempt, before any message is built.
    pub nonce: Option<String>,
    /// Server-first reply carried back in the handshake response, if the
    /// server engaged the fast path.
    pub speculative_response: Option<Document>,
    /// Cooperative cancellation, observed at every suspension point.
    pub cancellation: CancellationToken,
}

impl<'conn, S> AuthContext<'conn, S> {
    pub fn new(credential: Credential, stream: &'conn mut S) -> Self {
        Self {
            credential,
            stream,
            nonce: None,
            speculative_response: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Capture the `speculativeAuthenticate` sub-document from the server's
    /// handshake reply. A server that ignored the speculative request leaves
    /// the context untouched and the conversation runs in full.
    pub fn record_handshake_response(&mut self, response: &Document) {
        if let Ok(reply) = response.get_document("speculativeAuthenticate") {
            self.speculative_response = Some(reply.clone());
        }
    }
}
