//! Client-side request signing.
//!
//! Produces the `x-client`, `x-timestamp`, `x-nonce` and `x-sig` headers for a
//! request, mirroring exactly what the verifier recomputes.

use crate::clock::{Clock, SystemClock};
use crate::crypto::{
    canonical::canonical_value,
    digest::sha256_hex,
    signing::{build_preimage, sign_ed25519, sign_hmac, PreimageFields},
    verify::decode_hmac_key,
};
use crate::protocol::models::{HEADER_CLIENT, HEADER_NONCE, HEADER_SIGNATURE, HEADER_TIMESTAMP};
use crate::SealgateError;
use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::SigningKey;
use rand::RngCore;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Random bytes per generated nonce.
pub const NONCE_BYTES: usize = 12;

/// Generate a fresh base64 nonce from the thread RNG.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

/// Secret key material held by a signer.
pub enum SigningSecret {
    /// Ed25519 signing key.
    Ed25519(SigningKey),
    /// Raw HMAC key bytes.
    Hmac(Vec<u8>),
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ed25519(_) => f.write_str("Ed25519(<redacted>)"),
            Self::Hmac(_) => f.write_str("Hmac(<redacted>)"),
        }
    }
}

/// Signature headers plus the canonical body to transmit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// `x-client` value.
    pub client: String,
    /// `x-timestamp` value.
    pub timestamp: String,
    /// `x-nonce` value.
    pub nonce: String,
    /// `x-sig` value.
    pub signature: String,
    /// Canonical JSON body that was hashed; send this as the request body.
    pub body: String,
}

impl SignedHeaders {
    /// Header `(name, value)` pairs, in wire order.
    pub fn pairs(&self) -> [(&'static str, String); 4] {
        [
            (HEADER_CLIENT, self.client.clone()),
            (HEADER_TIMESTAMP, self.timestamp.clone()),
            (HEADER_NONCE, self.nonce.clone()),
            (HEADER_SIGNATURE, self.signature.clone()),
        ]
    }
}

/// Signs requests for one client identity.
pub struct RequestSigner {
    domain_tag: String,
    client_id: String,
    secret: SigningSecret,
    clock: Arc<dyn Clock>,
}

impl RequestSigner {
    /// Ed25519 signer. The client id is the base64 verifying key.
    pub fn ed25519(signing_key: SigningKey, domain_tag: impl Into<String>) -> Self {
        let client_id = STANDARD.encode(signing_key.verifying_key().to_bytes());
        Self {
            domain_tag: domain_tag.into(),
            client_id,
            secret: SigningSecret::Ed25519(signing_key),
            clock: Arc::new(SystemClock),
        }
    }

    /// Ed25519 signer from a base64 32-byte seed.
    pub fn ed25519_from_seed_b64(
        seed_b64: &str,
        domain_tag: impl Into<String>,
    ) -> Result<Self, SealgateError> {
        let bytes = STANDARD
            .decode(seed_b64.trim())
            .map_err(|e| SealgateError::ConfigError(format!("Invalid seed base64: {}", e)))?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| SealgateError::ConfigError("Ed25519 seed must be 32 bytes".to_string()))?;
        Ok(Self::ed25519(SigningKey::from_bytes(&seed), domain_tag))
    }

    /// HMAC signer for `client_id` with a base64 shared key.
    pub fn hmac(
        key_b64: &str,
        client_id: impl Into<String>,
        domain_tag: impl Into<String>,
    ) -> Result<Self, SealgateError> {
        Ok(Self {
            domain_tag: domain_tag.into(),
            client_id: client_id.into(),
            secret: SigningSecret::Hmac(decode_hmac_key(key_b64)?),
            clock: Arc::new(SystemClock),
        })
    }

    /// Use a custom clock for timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Override the `x-client` value.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// The `x-client` value this signer emits.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Base64 verifying key, for Ed25519 signers.
    pub fn public_key_b64(&self) -> Option<String> {
        match &self.secret {
            SigningSecret::Ed25519(key) => Some(STANDARD.encode(key.verifying_key().to_bytes())),
            SigningSecret::Hmac(_) => None,
        }
    }

    /// Sign a request stamped with the current time and a fresh nonce.
    pub fn sign(
        &self,
        method: &str,
        path: &str,
        body: Option<&Value>,
    ) -> Result<SignedHeaders, SealgateError> {
        self.sign_at(method, path, body, self.clock.now_unix(), &generate_nonce())
    }

    /// Sign a request with an explicit timestamp and nonce.
    pub fn sign_at(
        &self,
        method: &str,
        path: &str,
        body: Option<&Value>,
        timestamp: i64,
        nonce: &str,
    ) -> Result<SignedHeaders, SealgateError> {
        let body = canonical_value(body.unwrap_or(&Value::Null));
        let body_hash_hex = sha256_hex(body.as_bytes());

        let preimage = build_preimage(&PreimageFields {
            domain_tag: &self.domain_tag,
            method,
            path,
            body_hash_hex: &body_hash_hex,
            timestamp,
            nonce,
        });

        let signature = match &self.secret {
            SigningSecret::Ed25519(key) => sign_ed25519(&preimage, key),
            SigningSecret::Hmac(key) => sign_hmac(&preimage, key)?,
        };

        Ok(SignedHeaders {
            client: self.client_id.clone(),
            timestamp: timestamp.to_string(),
            nonce: nonce.to_string(),
            signature,
            body,
        })
    }
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("domain_tag", &self.domain_tag)
            .field("client_id", &self.client_id)
            .field("secret", &self.secret)
            .finish()
    }
}
