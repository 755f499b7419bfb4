//! Crate error types

use std::io;

use thiserror::Error;

/// Convenience result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by a SCRAM authentication attempt.
///
/// Every error is terminal for the attempt; the crate never retries
/// internally. Messages may mention the mechanism, the server's own error
/// text, and the iteration count, but never the password, the salted
/// password, a derived key, or the client proof.
#[derive(Debug, Error)]
pub enum Error {
    /// Credentials were rejected before any I/O took place.
    #[error("invalid credential: {0}")]
    InvalidInput(String),

    /// The system random number generator failed while producing a nonce.
    #[error("system random number generator unavailable")]
    RandomnessUnavailable,

    /// The connection reported a transport-level failure.
    #[error("transport failure during authentication: {0}")]
    Transport(String),

    /// The server returned a structured error (`$err`, `errmsg`, `ok: 0`, or
    /// a SASL `e=` payload).
    #[error("server error: {0}")]
    Server(String),

    /// A server reply was structurally malformed.
    #[error("invalid server response: {0}")]
    InvalidResponse(String),

    /// The server proposed a PBKDF2 iteration count below the accepted
    /// minimum of 4096.
    #[error("iteration count {0} is below the minimum of 4096")]
    WeakIterations(u32),

    /// The server's combined nonce does not extend the client nonce.
    #[error("server nonce does not extend the client nonce")]
    InvalidNonce,

    /// The server's `v=` signature does not match the expected HMAC. This
    /// must never be retried by any layer.
    #[error("server signature verification failed")]
    ServerSignatureInvalid,

    /// Cancellation was observed at a suspension point.
    #[error("authentication cancelled")]
    Cancelled,

    /// A conversation was driven through an impossible state transition.
    #[error("invalid conversation state: expected {expected}, got {actual}")]
    InvalidState {
        /// Description of the transitions that would have been valid
        expected: String,
        /// The transition that was attempted
        actual: String,
    },
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Transport(err.to_string())
    }
}
