//! Signature verification under Ed25519 or HMAC-SHA256.
//!
//! The free functions take base64 inputs and never error: malformed base64,
//! wrong-length keys or signatures all verify as `false`. The
//! [`SignatureVerifier`] implementations hold pre-decoded key material and are
//! chosen once from configuration by [`build_verifier`].

use crate::config::{KeyMaterial, SigningMode};
use crate::crypto::signing::HmacSha256;
use crate::SealgateError;
use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use hmac::Mac;
use std::fmt;

/// Decode a base64-encoded Ed25519 public key.
pub fn decode_public_key(public_key_b64: &str) -> Result<VerifyingKey, SealgateError> {
    let bytes = STANDARD
        .decode(public_key_b64.trim())
        .map_err(|e| SealgateError::ConfigError(format!("Invalid public key base64: {}", e)))?;

    let key_array: [u8; 32] = bytes
        .try_into()
        .map_err(|_| SealgateError::ConfigError("Public key must be 32 bytes".to_string()))?;

    VerifyingKey::from_bytes(&key_array)
        .map_err(|e| SealgateError::ConfigError(format!("Invalid Ed25519 public key: {}", e)))
}

/// Decode a base64-encoded HMAC key. Empty keys are refused.
pub fn decode_hmac_key(key_b64: &str) -> Result<Vec<u8>, SealgateError> {
    let key = STANDARD
        .decode(key_b64.trim())
        .map_err(|e| SealgateError::ConfigError(format!("Invalid HMAC key base64: {}", e)))?;

    if key.is_empty() {
        return Err(SealgateError::ConfigError(
            "HMAC key cannot be empty".to_string(),
        ));
    }

    Ok(key)
}

fn decode_signature(signature_b64: &str) -> Option<Signature> {
    let bytes = STANDARD.decode(signature_b64).ok()?;
    let sig_array: [u8; 64] = bytes.try_into().ok()?;
    Some(Signature::from_bytes(&sig_array))
}

fn verify_ed25519_with_key(
    preimage: &[u8],
    signature_b64: &str,
    verifying_key: &VerifyingKey,
) -> bool {
    match decode_signature(signature_b64) {
        Some(signature) => verifying_key.verify(preimage, &signature).is_ok(),
        None => false,
    }
}

fn verify_hmac_with_key(preimage: &[u8], key: &[u8], signature_b64: &str) -> bool {
    let Ok(expected) = STANDARD.decode(signature_b64) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        return false;
    };
    mac.update(preimage);
    // Constant-time comparison.
    mac.verify_slice(&expected).is_ok()
}

/// Verify a detached Ed25519 signature over `preimage`.
pub fn verify_ed25519(preimage: &[u8], signature_b64: &str, public_key_b64: &str) -> bool {
    match decode_public_key(public_key_b64) {
        Ok(key) => verify_ed25519_with_key(preimage, signature_b64, &key),
        Err(_) => false,
    }
}

/// Verify an HMAC-SHA256 tag over `preimage`.
pub fn verify_hmac(preimage: &[u8], key_b64: &str, signature_b64: &str) -> bool {
    match STANDARD.decode(key_b64) {
        Ok(key) if !key.is_empty() => verify_hmac_with_key(preimage, &key, signature_b64),
        _ => false,
    }
}

/// A configured signature scheme.
pub trait SignatureVerifier: Send + Sync {
    /// The scheme this verifier implements.
    fn mode(&self) -> SigningMode;

    /// Check `signature_b64` over `preimage` for the given client identity.
    fn verify(&self, preimage: &[u8], signature_b64: &str, client_id: &str) -> bool;
}

#[derive(Debug, Clone, Copy)]
enum Ed25519KeySource {
    Pinned(VerifyingKey),
    ClientId,
}

/// Ed25519 verifier, either pinned to one key or keyed by the client id.
#[derive(Debug, Clone, Copy)]
pub struct Ed25519Verifier {
    source: Ed25519KeySource,
}

impl Ed25519Verifier {
    /// Accept only signatures from `key`.
    pub fn pinned(key: VerifyingKey) -> Self {
        Self {
            source: Ed25519KeySource::Pinned(key),
        }
    }

    /// Treat the client id as the base64 verifying key.
    pub fn client_keyed() -> Self {
        Self {
            source: Ed25519KeySource::ClientId,
        }
    }
}

impl SignatureVerifier for Ed25519Verifier {
    fn mode(&self) -> SigningMode {
        SigningMode::Ed25519
    }

    fn verify(&self, preimage: &[u8], signature_b64: &str, client_id: &str) -> bool {
        match &self.source {
            Ed25519KeySource::Pinned(key) => verify_ed25519_with_key(preimage, signature_b64, key),
            Ed25519KeySource::ClientId => verify_ed25519(preimage, signature_b64, client_id),
        }
    }
}

/// HMAC-SHA256 verifier over a shared secret.
pub struct HmacVerifier {
    key: Vec<u8>,
}

impl HmacVerifier {
    /// Create a verifier from raw key bytes.
    pub fn new(key: Vec<u8>) -> Result<Self, SealgateError> {
        if key.is_empty() {
            return Err(SealgateError::ConfigError(
                "HMAC key cannot be empty".to_string(),
            ));
        }
        Ok(Self { key })
    }
}

impl fmt::Debug for HmacVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacVerifier")
            .field("key", &"<redacted>")
            .finish()
    }
}

impl SignatureVerifier for HmacVerifier {
    fn mode(&self) -> SigningMode {
        SigningMode::Hmac
    }

    fn verify(&self, preimage: &[u8], signature_b64: &str, _client_id: &str) -> bool {
        verify_hmac_with_key(preimage, &self.key, signature_b64)
    }
}

/// Select and initialize the verifier for the configured key material.
///
/// # Errors
/// * `ConfigError` - key material does not decode
pub fn build_verifier(keys: &KeyMaterial) -> Result<Box<dyn SignatureVerifier>, SealgateError> {
    match keys {
        KeyMaterial::Ed25519 { public_key_b64 } => Ok(Box::new(Ed25519Verifier::pinned(
            decode_public_key(public_key_b64)?,
        ))),
        KeyMaterial::Ed25519ClientKey => Ok(Box::new(Ed25519Verifier::client_keyed())),
        KeyMaterial::Hmac { key_b64 } => Ok(Box::new(HmacVerifier::new(decode_hmac_key(
            key_b64,
        )?)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::signing::{sign_ed25519, sign_hmac};
    use ed25519_dalek::SigningKey;

    // RFC 8032 test 1 keypair (DO NOT USE IN PRODUCTION)
    const TEST_SEED_HEX: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";
    const TEST_PUBLIC_KEY_HEX: &str =
        "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";
    const OTHER_SEED: [u8; 32] = [7u8; 32];

    const PREIMAGE: &[u8] = b"sunex:api:v1|POST|/api/orders|abc|1736942400|n1";

    fn signing_key() -> SigningKey {
        let bytes = hex::decode(TEST_SEED_HEX).unwrap();
        SigningKey::from_bytes(&bytes.try_into().unwrap())
    }

    fn public_key_b64() -> String {
        STANDARD.encode(hex::decode(TEST_PUBLIC_KEY_HEX).unwrap())
    }

    fn flip_b64_byte(b64: &str, index: usize) -> String {
        let mut bytes = STANDARD.decode(b64).unwrap();
        bytes[index] ^= 0x01;
        STANDARD.encode(bytes)
    }

    #[test]
    fn test_decode_public_key_valid() {
        let key = decode_public_key(&public_key_b64()).unwrap();
        assert_eq!(hex::encode(key.to_bytes()), TEST_PUBLIC_KEY_HEX);
    }

    #[test]
    fn test_decode_public_key_invalid_base64() {
        let result = decode_public_key("not-valid-base64!!!");
        assert!(matches!(result, Err(SealgateError::ConfigError(_))));
    }

    #[test]
    fn test_decode_public_key_wrong_length() {
        let result = decode_public_key(&STANDARD.encode([1u8; 16]));
        assert!(matches!(result, Err(SealgateError::ConfigError(_))));
    }

    #[test]
    fn test_decode_hmac_key_empty() {
        assert!(matches!(
            decode_hmac_key(""),
            Err(SealgateError::ConfigError(_))
        ));
    }

    #[test]
    fn test_verify_ed25519_round_trip() {
        let signature = sign_ed25519(PREIMAGE, &signing_key());
        assert!(verify_ed25519(PREIMAGE, &signature, &public_key_b64()));
    }

    #[test]
    fn test_verify_ed25519_tampered_preimage() {
        let signature = sign_ed25519(PREIMAGE, &signing_key());
        let mut tampered = PREIMAGE.to_vec();
        tampered[10] ^= 0x01;
        assert!(!verify_ed25519(&tampered, &signature, &public_key_b64()));
    }

    #[test]
    fn test_verify_ed25519_tampered_signature() {
        let signature = sign_ed25519(PREIMAGE, &signing_key());
        let tampered = flip_b64_byte(&signature, 5);
        assert!(!verify_ed25519(PREIMAGE, &tampered, &public_key_b64()));
    }

    #[test]
    fn test_verify_ed25519_wrong_public_key() {
        let signature = sign_ed25519(PREIMAGE, &signing_key());
        let other = SigningKey::from_bytes(&OTHER_SEED).verifying_key();
        assert!(!verify_ed25519(
            PREIMAGE,
            &signature,
            &STANDARD.encode(other.to_bytes())
        ));
    }

    #[test]
    fn test_verify_ed25519_malformed_inputs_are_false() {
        let signature = sign_ed25519(PREIMAGE, &signing_key());
        assert!(!verify_ed25519(PREIMAGE, "not-valid-base64!!!", &public_key_b64()));
        assert!(!verify_ed25519(PREIMAGE, "dGVzdA==", &public_key_b64()));
        assert!(!verify_ed25519(PREIMAGE, &signature, "dGVzdA=="));
        assert!(!verify_ed25519(PREIMAGE, &signature, ""));
        assert!(!verify_ed25519(PREIMAGE, &STANDARD.encode([0u8; 64]), &public_key_b64()));
    }

    #[test]
    fn test_verify_hmac_round_trip_and_wrong_key() {
        let key = b"shared-secret-for-tests";
        let key_b64 = STANDARD.encode(key);
        let tag = sign_hmac(PREIMAGE, key).unwrap();

        assert!(verify_hmac(PREIMAGE, &key_b64, &tag));
        assert!(!verify_hmac(PREIMAGE, &STANDARD.encode(b"other-secret"), &tag));
        assert!(!verify_hmac(b"different preimage", &key_b64, &tag));
    }

    #[test]
    fn test_verify_hmac_malformed_inputs_are_false() {
        let key_b64 = STANDARD.encode(b"k");
        let tag = sign_hmac(PREIMAGE, b"k").unwrap();
        let truncated = STANDARD.encode(&STANDARD.decode(&tag).unwrap()[..16]);

        assert!(!verify_hmac(PREIMAGE, &key_b64, &truncated));
        assert!(!verify_hmac(PREIMAGE, &key_b64, "%%%"));
        assert!(!verify_hmac(PREIMAGE, "%%%", &tag));
        assert!(!verify_hmac(PREIMAGE, "", &tag));
        assert!(!verify_hmac(PREIMAGE, &key_b64, &flip_b64_byte(&tag, 31)));
    }

    #[test]
    fn test_pinned_verifier_ignores_client_id() {
        let verifier = Ed25519Verifier::pinned(signing_key().verifying_key());
        let signature = sign_ed25519(PREIMAGE, &signing_key());
        assert!(verifier.verify(PREIMAGE, &signature, "anything"));
        assert_eq!(verifier.mode(), SigningMode::Ed25519);
    }

    #[test]
    fn test_client_keyed_verifier_uses_client_id() {
        let verifier = Ed25519Verifier::client_keyed();
        let signature = sign_ed25519(PREIMAGE, &signing_key());
        assert!(verifier.verify(PREIMAGE, &signature, &public_key_b64()));

        let other = STANDARD.encode(SigningKey::from_bytes(&OTHER_SEED).verifying_key().to_bytes());
        assert!(!verifier.verify(PREIMAGE, &signature, &other));
        assert!(!verifier.verify(PREIMAGE, &signature, "client-42"));
    }

    #[test]
    fn test_build_verifier_selects_mode() {
        let ed = build_verifier(&KeyMaterial::Ed25519 {
            public_key_b64: public_key_b64(),
        })
        .unwrap();
        assert_eq!(ed.mode(), SigningMode::Ed25519);

        let hmac = build_verifier(&KeyMaterial::Hmac {
            key_b64: STANDARD.encode(b"secret"),
        })
        .unwrap();
        assert_eq!(hmac.mode(), SigningMode::Hmac);
    }

    #[test]
    fn test_build_verifier_rejects_bad_key_material() {
        let result = build_verifier(&KeyMaterial::Ed25519 {
            public_key_b64: "short".to_string(),
        });
        assert!(matches!(result, Err(SealgateError::ConfigError(_))));

        let result = build_verifier(&KeyMaterial::Hmac {
            key_b64: String::new(),
        });
        assert!(matches!(result, Err(SealgateError::ConfigError(_))));
    }

    #[test]
    fn test_hmac_verifier_debug_redacts_key() {
        let verifier = HmacVerifier::new(b"super-secret".to_vec()).unwrap();
        assert!(!format!("{:?}", verifier).contains("super"));
    }
}
