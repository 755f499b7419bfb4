//! SCRAM client authentication for the MongoDB wire protocol
//!
//! Implements the client side of SCRAM-SHA-1 and SCRAM-SHA-256 (RFC 5802 /
//! RFC 7677) the way MongoDB speaks it: the SASL conversation runs as
//! `saslStart` / `saslContinue` commands against the authentication
//! database, passwords are prepared with MongoDB's legacy MD5 digest
//! (SHA-1) or SASLprep (SHA-256), PBKDF2 results are memoized across
//! attempts, and the first client message can be piggy-backed onto the
//! connection handshake ("speculative authentication").
//!
//! The crate owns the conversation state machine and its cryptographic
//! pipeline. The connection, handshake orchestration, and TLS belong to the
//! driver embedding it; they meet this crate at the [`SaslStream`] trait.
//!
//! ```no_run
//! # async fn example(stream: &mut impl mongowire_scram::SaslStream) -> mongowire_scram::Result<()> {
//! use mongowire_scram::{AuthContext, Credential, ScramAuthenticator, ScramVersion};
//!
//! let credential = Credential::new("app_user", "hunter2");
//! let mut context = AuthContext::new(credential, stream);
//!
//! let authenticator = ScramAuthenticator::new(ScramVersion::Sha256);
//! let reply = authenticator.authenticate(&mut context).await?;
//! # let _ = reply;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod connection;
mod crypto;
mod error;

pub use auth::{AuthContext, Credential, ScramAuthenticator, ScramVersion};
pub use connection::SaslStream;
pub use error::{Error, Result};
