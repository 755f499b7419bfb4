//! SASL conversation engine
//!
//! One conversation per connection attempt, driven as an explicit state
//! machine: `saslStart` (skipped when the handshake already carried the
//! first round), the proof-bearing `saslContinue`, and one terminal empty
//! `saslContinue` when the server declines `skipEmptyExchange`.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bson::Document;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::cache::SALTED_PASSWORD_CACHE;
use super::messages::{self, ClientFirst, ServerFinal, ServerFirst};
use super::{password, Credential, ScramVersion};
use crate::connection::{command_namespace, SaslStream};
use crate::{crypto, Error, Result};

/// Conversation state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConversationState {
    /// No message exchanged yet
    Init,

    /// Client-first sent, or adopted from the speculative handshake
    FirstSent,

    /// Client-final (the proof) sent
    FinalSent,

    /// Proof exchange verified; the terminal empty exchange is outstanding
    RetryEmpty,

    /// Authentication complete
    Done,

    /// Terminal failure; the returned error carries the reason
    Failed,
}

impl ConversationState {
    /// Check if transition is valid
    fn can_transition_to(self, next: ConversationState) -> bool {
        use ConversationState::*;

        matches!(
            (self, next),
            (Init, FirstSent)
                | (FirstSent, FinalSent)
                | (FinalSent, Done)
                | (FinalSent, RetryEmpty)
                | (RetryEmpty, Done)
                | (Init | FirstSent | FinalSent | RetryEmpty, Failed)
        )
    }

    /// Transition to new state
    fn transition(&mut self, next: ConversationState) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(Error::InvalidState {
                expected: format!("valid transition from {:?}", self),
                actual: format!("{:?}", next),
            });
        }
        *self = next;
        Ok(())
    }
}

/// Drives one SCRAM conversation over a connection.
///
/// The engine is strictly sequential: the next command is never issued
/// before the prior reply has been consumed, and it never retries; the
/// caller owns retry policy.
pub(crate) struct Conversation<'a, S> {
    version: ScramVersion,
    credential: &'a Credential,
    stream: &'a mut S,
    cancellation: &'a CancellationToken,
    nonce: &'a str,
    state: ConversationState,
}

impl<'a, S: SaslStream> Conversation<'a, S> {
    pub(crate) fn new(
        version: ScramVersion,
        credential: &'a Credential,
        stream: &'a mut S,
        cancellation: &'a CancellationToken,
        nonce: &'a str,
    ) -> Self {
        Self {
            version,
            credential,
            stream,
            cancellation,
            nonce,
            state: ConversationState::Init,
        }
    }

    /// Run the conversation to completion, returning the final server reply.
    ///
    /// A speculative server-first reply (lifted out of the handshake
    /// response) replaces the saslStart round entirely.
    pub(crate) async fn run(mut self, speculative_response: Option<Document>) -> Result<Document> {
        match self.drive(speculative_response).await {
            Ok(reply) => Ok(reply),
            Err(err) => {
                self.state = ConversationState::Failed;
                Err(err)
            }
        }
    }

    async fn drive(&mut self, speculative_response: Option<Document>) -> Result<Document> {
        let client_first = ClientFirst::new(&self.credential.username, self.nonce);

        let first_reply = match speculative_response {
            Some(reply) => {
                debug!("adopting speculative server-first reply");
                reply
            }
            None => {
                debug!(mechanism = self.version.as_str(), "submitting saslStart");
                self.submit(client_first.to_command(self.version)).await?
            }
        };
        self.state.transition(ConversationState::FirstSent)?;

        let server_first = ServerFirst::parse(&first_reply)?;
        server_first.validate(self.nonce)?;

        let prepped =
            password::prepare(self.version, &self.credential.username, &self.credential.password)?;
        let salted_password = SALTED_PASSWORD_CACHE.get_or_compute(
            self.version,
            &prepped,
            server_first.salt(),
            server_first.iterations(),
        );

        let client_key = crypto::hmac(self.version, &salted_password, b"Client Key")?;
        let server_key = crypto::hmac(self.version, &salted_password, b"Server Key")?;
        let stored_key = crypto::hash(self.version, &client_key);

        // All three AuthMessage components are fixed before any keyed HMAC
        // over it is computed.
        let without_proof = messages::client_final_without_proof(server_first.nonce());
        let auth_message = format!(
            "{},{},{}",
            client_first.bare(),
            server_first.message(),
            without_proof
        );

        let client_signature = crypto::hmac(self.version, &stored_key, auth_message.as_bytes())?;
        let client_proof = BASE64.encode(crypto::xor(&client_key, &client_signature));
        let expected_signature = crypto::hmac(self.version, &server_key, auth_message.as_bytes())?;

        let client_final = messages::client_final(&without_proof, &client_proof);
        debug!("submitting client proof");
        let final_reply = self
            .submit(messages::sasl_continue_command(
                server_first.conversation_id().clone(),
                client_final.into_bytes(),
            ))
            .await?;
        self.state.transition(ConversationState::FinalSent)?;

        let server_final = ServerFinal::parse(&final_reply)?;
        if server_final.conversation_id() != server_first.conversation_id() {
            return Err(Error::InvalidResponse("mismatched conversationId".to_string()));
        }
        if !crypto::constant_time_eq(server_final.signature()?, &expected_signature) {
            return Err(Error::ServerSignatureInvalid);
        }

        if server_final.done() {
            self.state.transition(ConversationState::Done)?;
            debug!("authentication complete");
            return Ok(final_reply);
        }

        // The server declined skipEmptyExchange; one empty payload closes
        // the dance, and its reply is the final outcome either way.
        self.state.transition(ConversationState::RetryEmpty)?;
        debug!("submitting terminal empty exchange");
        let terminal_reply = self
            .submit(messages::sasl_continue_command(
                server_first.conversation_id().clone(),
                Vec::new(),
            ))
            .await?;
        messages::validate_command_success(&terminal_reply)?;
        self.state.transition(ConversationState::Done)?;
        debug!("authentication complete");
        Ok(terminal_reply)
    }

    /// Submit one command, observing cancellation for the whole suspension.
    async fn submit(&mut self, command: Document) -> Result<Document> {
        let namespace = command_namespace(self.credential.resolved_source());
        match self
            .cancellation
            .run_until_cancelled(self.stream.submit_command(&namespace, command))
            .await
        {
            Some(reply) => reply,
            None => Err(Error::Cancelled),
        }
    }
}
