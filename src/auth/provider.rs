//! Public façade: prepare / authenticate

use bson::Document;
use tracing::debug;

use super::conversation::Conversation;
use super::messages::ClientFirst;
use super::{AuthContext, ScramVersion};
use crate::connection::SaslStream;
use crate::{crypto, Result};

/// SCRAM authentication provider for one hash family.
///
/// [`prepare`](Self::prepare) piggy-backs the first client message onto the
/// connection handshake ("speculative authentication");
/// [`authenticate`](Self::authenticate) drives the remaining conversation,
/// consuming the server's speculative reply when one arrived.
#[derive(Debug, Clone, Copy)]
pub struct ScramAuthenticator {
    version: ScramVersion,
}

impl ScramAuthenticator {
    pub fn new(version: ScramVersion) -> Self {
        Self { version }
    }

    pub fn version(&self) -> ScramVersion {
        self.version
    }

    /// Augment a handshake document with a `speculativeAuthenticate` field.
    ///
    /// Generates the client nonce and stores it on the context so the
    /// piggy-backed first message and any later in-band one are identical.
    pub fn prepare<S>(
        &self,
        mut handshake: Document,
        context: &mut AuthContext<'_, S>,
    ) -> Result<Document> {
        context.credential.validate(self.version)?;

        let nonce = crypto::generate_nonce()?;
        let client_first = ClientFirst::new(&context.credential.username, &nonce);
        context.nonce = Some(nonce);

        let mut sasl_start = client_first.to_command(self.version);
        sasl_start.insert("db", context.credential.resolved_source());
        handshake.insert("speculativeAuthenticate", sasl_start);

        debug!(mechanism = %self.version, "prepared speculative authentication");
        Ok(handshake)
    }

    /// Run the SASL conversation to completion, returning the final server
    /// reply.
    ///
    /// When the handshake produced a speculative server-first reply, the
    /// saslStart round is skipped and the conversation resumes from there.
    pub async fn authenticate<S: SaslStream>(
        &self,
        context: &mut AuthContext<'_, S>,
    ) -> Result<Document> {
        context.credential.validate(self.version)?;

        let nonce = match context.nonce.clone() {
            Some(nonce) => nonce,
            None => {
                let nonce = crypto::generate_nonce()?;
                context.nonce = Some(nonce.clone());
                nonce
            }
        };
        let speculative_response = context.speculative_response.take();

        let conversation = Conversation::new(
            self.version,
            &context.credential,
            &mut *context.stream,
            &context.cancellation,
            &nonce,
        );
        conversation.run(speculative_response).await
    }
}
