//! Preimage construction and signing.
//!
//! The preimage is the exact byte string that gets signed:
//! ```text
//! <domain tag>|<METHOD>|<path>|<body sha-256 hex>|<unix seconds>|<nonce>
//! ```
//! Field order and the `|` separator are a wire contract shared with every
//! signing client.

use crate::SealgateError;
use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::{Signer, SigningKey};
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Field separator inside the preimage.
pub const PREIMAGE_SEPARATOR: &str = "|";

pub(crate) type HmacSha256 = Hmac<Sha256>;

/// The fields bound together by a request signature.
#[derive(Debug, Clone, Copy)]
pub struct PreimageFields<'a> {
    /// Domain separation tag, e.g. `sunex:api:v1`.
    pub domain_tag: &'a str,
    /// HTTP method; upper-cased in the preimage.
    pub method: &'a str,
    /// Request path, used verbatim.
    pub path: &'a str,
    /// SHA-256 hex digest of the canonical body.
    pub body_hash_hex: &'a str,
    /// Unix seconds.
    pub timestamp: i64,
    /// Client-chosen nonce.
    pub nonce: &'a str,
}

/// Build the preimage bytes for a request.
pub fn build_preimage(fields: &PreimageFields<'_>) -> Vec<u8> {
    let method = fields.method.to_uppercase();
    let timestamp = fields.timestamp.to_string();

    [
        fields.domain_tag,
        method.as_str(),
        fields.path,
        fields.body_hash_hex,
        timestamp.as_str(),
        fields.nonce,
    ]
    .join(PREIMAGE_SEPARATOR)
    .into_bytes()
}

/// Sign a preimage with Ed25519, returning the base64 detached signature.
pub fn sign_ed25519(preimage: &[u8], signing_key: &SigningKey) -> String {
    STANDARD.encode(signing_key.sign(preimage).to_bytes())
}

/// Compute HMAC-SHA256 over a preimage, returning the base64 tag.
pub fn sign_hmac(preimage: &[u8], key: &[u8]) -> Result<String, SealgateError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| SealgateError::ConfigError(format!("Invalid HMAC key: {}", e)))?;
    mac.update(preimage);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}
