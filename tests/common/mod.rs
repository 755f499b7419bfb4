//! Shared test support: a scripted in-memory SASL server.
//!
//! Each test declares the exact commands it expects (namespace, command
//! shape, payload bytes) and the replies to serve. Any deviation panics the
//! test; the server-side SCRAM math is recomputed here independently of the
//! crate under test.

#![allow(dead_code)]

use bson::{spec::BinarySubtype, Binary, Bson, Document};
use mongowire_scram::{Error, Result, SaslStream};

pub fn binary(bytes: impl Into<Vec<u8>>) -> Bson {
    Bson::Binary(Binary {
        subtype: BinarySubtype::Generic,
        bytes: bytes.into(),
    })
}

/// What the next submitted command must look like.
pub enum Expect {
    SaslStart {
        mechanism: &'static str,
        payload: String,
    },
    SaslContinue {
        conversation_id: i32,
        payload: String,
    },
}

/// What to serve for it.
pub enum Reply {
    Document(Document),
    Transport(String),
}

pub struct Step {
    pub namespace: &'static str,
    pub expect: Expect,
    pub reply: Reply,
}

/// A connection whose server follows a fixed script.
pub struct MockStream {
    script: Vec<Step>,
    submitted: usize,
}

impl MockStream {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script,
            submitted: 0,
        }
    }

    /// Number of commands the client actually submitted.
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// True once every scripted exchange has been consumed.
    pub fn finished(&self) -> bool {
        self.submitted == self.script.len()
    }
}

impl SaslStream for MockStream {
    async fn submit_command(&mut self, namespace: &str, command: Document) -> Result<Document> {
        let step = self
            .script
            .get(self.submitted)
            .unwrap_or_else(|| panic!("unexpected extra command: {:?}", command));
        self.submitted += 1;

        assert_eq!(namespace, step.namespace, "command namespace");

        match &step.expect {
            Expect::SaslStart { mechanism, payload } => {
                assert_eq!(command.get_i32("saslStart").unwrap(), 1);
                assert_eq!(command.get_str("mechanism").unwrap(), *mechanism);
                assert_eq!(command.get_i32("autoAuthorize").unwrap(), 1);
                assert!(command
                    .get_document("options")
                    .unwrap()
                    .get_bool("skipEmptyExchange")
                    .unwrap());
                let bytes = command.get_binary_generic("payload").unwrap();
                assert_eq!(String::from_utf8_lossy(bytes), *payload, "saslStart payload");
            }
            Expect::SaslContinue {
                conversation_id,
                payload,
            } => {
                assert_eq!(command.get_i32("saslContinue").unwrap(), 1);
                assert_eq!(
                    command.get_i32("conversationId").unwrap(),
                    *conversation_id,
                    "conversationId echo"
                );
                let bytes = command.get_binary_generic("payload").unwrap();
                assert_eq!(
                    String::from_utf8_lossy(bytes),
                    *payload,
                    "saslContinue payload"
                );
            }
        }

        match &step.reply {
            Reply::Document(reply) => Ok(reply.clone()),
            Reply::Transport(message) => Err(Error::Transport(message.clone())),
        }
    }
}

/// Server-side SCRAM-SHA-1 math, recomputed with the raw crypto crates.
pub mod scram_sha1 {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use hmac::{Hmac, Mac};
    use md5::Md5;
    use sha1::{Digest, Sha1};

    /// MongoDB's legacy password digest: lowercase hex of
    /// `MD5("<username>:mongo:<password>")`.
    pub fn password_digest(username: &str, password: &str) -> String {
        let mut md5 = Md5::new();
        md5.update(format!("{}:mongo:{}", username, password));
        hex::encode(md5.finalize())
    }

    pub fn hi(password: &[u8], salt: &[u8], iterations: u32) -> Vec<u8> {
        let mut salted = vec![0u8; 20];
        let _ = pbkdf2::pbkdf2::<Hmac<Sha1>>(password, salt, iterations, &mut salted);
        salted
    }

    pub fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
        let mut mac = Hmac::<Sha1>::new_from_slice(key).unwrap();
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }

    pub fn h(data: &[u8]) -> Vec<u8> {
        Sha1::digest(data).to_vec()
    }

    pub fn xor(lhs: &[u8], rhs: &[u8]) -> Vec<u8> {
        assert_eq!(lhs.len(), rhs.len());
        lhs.iter().zip(rhs.iter()).map(|(l, r)| l ^ r).collect()
    }

    /// Everything a scripted server needs for one conversation.
    pub struct ServerSide {
        pub server_first: String,
        pub expected_client_final: String,
        pub server_final: String,
    }

    /// Compute the full exchange for the given credentials and nonces.
    pub fn exchange(
        username: &str,
        password: &str,
        client_nonce: &str,
        combined_nonce: &str,
        salt_base64: &str,
        iterations: u32,
    ) -> ServerSide {
        let server_first = format!("r={},s={},i={}", combined_nonce, salt_base64, iterations);

        let digest = password_digest(username, password);
        let salt = BASE64.decode(salt_base64).unwrap();
        let salted = hi(digest.as_bytes(), &salt, iterations);

        let client_key = hmac(&salted, b"Client Key");
        let stored_key = h(&client_key);
        let auth_message = format!(
            "n={},r={},{},c=biws,r={}",
            username, client_nonce, server_first, combined_nonce
        );
        let client_signature = hmac(&stored_key, auth_message.as_bytes());
        let proof = BASE64.encode(xor(&client_key, &client_signature));
        let expected_client_final = format!("c=biws,r={},p={}", combined_nonce, proof);

        let server_key = hmac(&salted, b"Server Key");
        let server_signature = BASE64.encode(hmac(&server_key, auth_message.as_bytes()));
        let server_final = format!("v={}", server_signature);

        ServerSide {
            server_first,
            expected_client_final,
            server_final,
        }
    }
}
