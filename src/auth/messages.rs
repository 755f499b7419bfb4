//! SASL message models and command builders
//!
//! Pure construction and parsing: the conversation engine computes keys and
//! proofs, these types shape them into `saslStart` / `saslContinue` command
//! documents and pick apart the server's replies.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bson::{doc, spec::BinarySubtype, Binary, Bson, Document};

use super::{attributes, ScramVersion};
use crate::{Error, Result};

/// GS2 header for a client without channel binding or authzid.
pub(crate) const GS2_HEADER: &str = "n,,";

/// Base64 of [`GS2_HEADER`], sent as the `c=` attribute.
pub(crate) const GS2_HEADER_BASE64: &str = "biws";

/// Minimum PBKDF2 iteration count accepted from a server.
pub(crate) const MIN_ITERATION_COUNT: u32 = 4096;

fn binary_payload(bytes: Vec<u8>) -> Bson {
    Bson::Binary(Binary {
        subtype: BinarySubtype::Generic,
        bytes,
    })
}

/// First message sent by the client.
pub(crate) struct ClientFirst {
    message: String,
    bare_start: usize,
}

impl ClientFirst {
    /// Build `n,,n=<escaped username>,r=<base64 nonce>`.
    pub(crate) fn new(username: &str, nonce: &str) -> Self {
        let escaped = attributes::escape_username(username);
        let bare = attributes::format(&[("n", escaped.as_str()), ("r", nonce)]);
        Self {
            message: format!("{}{}", GS2_HEADER, bare),
            bare_start: GS2_HEADER.len(),
        }
    }

    /// The bare message, without the GS2 header; first component of the
    /// AuthMessage.
    pub(crate) fn bare(&self) -> &str {
        &self.message[self.bare_start..]
    }

    pub(crate) fn message(&self) -> &str {
        &self.message
    }

    /// The `saslStart` command carrying this message.
    pub(crate) fn to_command(&self, version: ScramVersion) -> Document {
        doc! {
            "saslStart": 1,
            "mechanism": version.as_str(),
            "payload": binary_payload(self.message().as_bytes().to_vec()),
            "autoAuthorize": 1,
            "options": { "skipEmptyExchange": true },
        }
    }
}

/// The `saslContinue` command echoing the server's conversation id.
pub(crate) fn sasl_continue_command(conversation_id: Bson, payload: Vec<u8>) -> Document {
    doc! {
        "saslContinue": 1,
        "conversationId": conversation_id,
        "payload": binary_payload(payload),
    }
}

/// `c=biws,r=<combined nonce>`, the client-final message before the proof.
pub(crate) fn client_final_without_proof(server_nonce: &str) -> String {
    attributes::format(&[("c", GS2_HEADER_BASE64), ("r", server_nonce)])
}

/// Append the base64 proof to a client-final message.
pub(crate) fn client_final(without_proof: &str, proof: &str) -> String {
    format!("{},p={}", without_proof, proof)
}

fn bson_int(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(i) => Some(i64::from(*i)),
        Bson::Int64(i) => Some(*i),
        Bson::Double(f) => Some(*f as i64),
        _ => None,
    }
}

/// Check a command reply for a server-reported failure.
///
/// MongoDB surfaces these as `$err` (legacy), `errmsg`, or `ok: 0`. The
/// speculative sub-document carries no `ok` field at all, so a missing `ok`
/// counts as success.
pub(crate) fn validate_command_success(response: &Document) -> Result<()> {
    if let Ok(err) = response.get_str("$err") {
        return Err(Error::Server(err.to_string()));
    }
    if let Ok(err) = response.get_str("errmsg") {
        return Err(Error::Server(err.to_string()));
    }
    match response.get("ok") {
        None => Ok(()),
        Some(ok) => match bson_int(ok) {
            Some(1) => Ok(()),
            Some(_) => Err(Error::Server("authentication failed".to_string())),
            None => Err(Error::InvalidResponse("non-numeric ok field".to_string())),
        },
    }
}

/// Extract the SASL payload, accepting both binary and string
/// representations.
fn payload_bytes(response: &Document) -> Result<Vec<u8>> {
    match response.get("payload") {
        Some(Bson::Binary(bin)) => Ok(bin.bytes.clone()),
        Some(Bson::String(s)) => Ok(s.clone().into_bytes()),
        Some(_) => Err(Error::InvalidResponse(
            "payload has an unexpected type".to_string(),
        )),
        None => Err(Error::InvalidResponse("reply is missing a payload".to_string())),
    }
}

fn conversation_id(response: &Document) -> Result<Bson> {
    response
        .get("conversationId")
        .cloned()
        .ok_or_else(|| Error::InvalidResponse("reply is missing a conversationId".to_string()))
}

/// First message received from the server.
///
/// Must be validated before any key derivation happens.
pub(crate) struct ServerFirst {
    conversation_id: Bson,
    done: bool,
    message: String,
    nonce: String,
    salt: Vec<u8>,
    iterations: u32,
}

impl ServerFirst {
    pub(crate) fn parse(response: &Document) -> Result<Self> {
        validate_command_success(response)?;

        let conversation_id = conversation_id(response)?;
        let done = response.get_bool("done").unwrap_or(false);
        let message = String::from_utf8(payload_bytes(response)?)
            .map_err(|_| Error::InvalidResponse("server-first payload is not UTF-8".to_string()))?;

        let fields = attributes::parse(&message);
        let nonce = fields
            .get("r")
            .ok_or_else(|| {
                Error::InvalidResponse("server-first is missing the r attribute".to_string())
            })?
            .to_string();
        let salt = BASE64
            .decode(fields.get("s").ok_or_else(|| {
                Error::InvalidResponse("server-first is missing the s attribute".to_string())
            })?)
            .map_err(|_| Error::InvalidResponse("salt is not valid base64".to_string()))?;
        let iterations = fields
            .get("i")
            .ok_or_else(|| {
                Error::InvalidResponse("server-first is missing the i attribute".to_string())
            })?
            .parse::<u32>()
            .map_err(|_| Error::InvalidResponse("iteration count is not numeric".to_string()))?;

        Ok(Self {
            conversation_id,
            done,
            message,
            nonce,
            salt,
            iterations,
        })
    }

    pub(crate) fn conversation_id(&self) -> &Bson {
        &self.conversation_id
    }

    /// The raw payload text; second component of the AuthMessage.
    pub(crate) fn message(&self) -> &str {
        &self.message
    }

    /// The combined client + server nonce.
    pub(crate) fn nonce(&self) -> &str {
        &self.nonce
    }

    pub(crate) fn salt(&self) -> &[u8] {
        &self.salt
    }

    pub(crate) fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Validate the server's challenge against the client nonce.
    pub(crate) fn validate(&self, client_nonce: &str) -> Result<()> {
        if self.done {
            return Err(Error::InvalidResponse(
                "conversation terminated before the proof exchange".to_string(),
            ));
        }
        // A server echoing a placeholder instead of a real combined nonce is
        // misconfigured; reject it outright.
        if !self.nonce.starts_with(client_nonce) || self.nonce.starts_with("nonce") {
            return Err(Error::InvalidNonce);
        }
        if self.iterations < MIN_ITERATION_COUNT {
            return Err(Error::WeakIterations(self.iterations));
        }
        Ok(())
    }
}

enum ServerFinalBody {
    Error(String),
    Verifier(Vec<u8>),
}

/// Final message received from the server.
///
/// Must be verified against the expected server signature before the
/// conversation may finish.
pub(crate) struct ServerFinal {
    conversation_id: Bson,
    done: bool,
    body: ServerFinalBody,
}

impl ServerFinal {
    pub(crate) fn parse(response: &Document) -> Result<Self> {
        validate_command_success(response)?;

        let conversation_id = conversation_id(response)?;
        // Command success implies ok: 1, so an absent done flag means the
        // server has nothing further to say.
        let done = response.get_bool("done").unwrap_or(true);
        let message = String::from_utf8(payload_bytes(response)?)
            .map_err(|_| Error::InvalidResponse("server-final payload is not UTF-8".to_string()))?;

        let fields = attributes::parse(&message);
        let body = if let Some(err) = fields.get("e") {
            ServerFinalBody::Error(err.to_string())
        } else if let Some(verifier) = fields.get("v") {
            let signature = BASE64.decode(verifier).map_err(|_| {
                Error::InvalidResponse("server signature is not valid base64".to_string())
            })?;
            ServerFinalBody::Verifier(signature)
        } else {
            return Err(Error::InvalidResponse(
                "server-final carries neither v= nor e=".to_string(),
            ));
        };

        Ok(Self {
            conversation_id,
            done,
            body,
        })
    }

    pub(crate) fn conversation_id(&self) -> &Bson {
        &self.conversation_id
    }

    pub(crate) fn done(&self) -> bool {
        self.done
    }

    /// The decoded `v=` signature, or the server's `e=` failure.
    pub(crate) fn signature(&self) -> Result<&[u8]> {
        match &self.body {
            ServerFinalBody::Verifier(signature) => Ok(signature),
            ServerFinalBody::Error(err) => Err(Error::Server(err.clone())),
        }
    }
}
