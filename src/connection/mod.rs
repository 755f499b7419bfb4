//! Connection contract
//!
//! The conversation engine is written against a minimal command-submission
//! interface. The embedding driver supplies the real connection; framing,
//! the BSON codec, timeouts, and TLS all live on that side of the boundary.

use bson::Document;

use crate::Result;

/// A connection that can submit one command and deliver its reply.
///
/// The namespace is always `<db>.$cmd`. Implementations surface
/// transport-level failures (including timeouts) as
/// [`Error::Transport`](crate::Error::Transport); a successfully delivered
/// reply may still carry a server-side error (`$err`, `errmsg`, `ok: 0`),
/// which the conversation engine inspects itself.
#[allow(async_fn_in_trait)]
pub trait SaslStream {
    /// Submit a command document and await the reply document.
    async fn submit_command(&mut self, namespace: &str, command: Document) -> Result<Document>;
}

/// The `$cmd` namespace for an authentication database.
pub(crate) fn command_namespace(source: &str) -> String {
    format!("{}.$cmd", source)
}
