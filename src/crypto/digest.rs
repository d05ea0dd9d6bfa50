//! SHA-256 digest computation over canonical bodies.

use crate::crypto::canonical::{canonical_body, canonical_value};
use crate::SealgateError;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Compute SHA-256 of `bytes` and return it as 64 lower-case hex characters.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Hash a raw request body the way the verifier does.
///
/// The body is parsed, canonicalized, and the UTF-8 canonical string hashed.
/// Empty bodies hash as `{}`.
pub fn body_hash_hex(body: &[u8]) -> Result<String, SealgateError> {
    let canonical = canonical_body(body)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

/// Hash an in-memory JSON value the way the verifier hashes its serialized form.
pub fn value_hash_hex(value: &Value) -> String {
    sha256_hex(canonical_value(value).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sha256_empty() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_sha256_abc() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_empty_body_hashes_as_empty_object() {
        let expected = "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a";
        assert_eq!(sha256_hex(b"{}"), expected);
        assert_eq!(body_hash_hex(b"").unwrap(), expected);
        assert_eq!(value_hash_hex(&Value::Null), expected);
    }

    #[test]
    fn test_hash_is_fixed_width_lowercase() {
        let digest = body_hash_hex(br#"{"b":[1,2],"a":"x"}"#).unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
    }

    #[test]
    fn test_body_and_value_hash_agree() {
        let value = json!({"qty": 5, "side": "buy"});
        let text = br#"{ "side": "buy", "qty": 5 }"#;
        assert_eq!(body_hash_hex(text).unwrap(), value_hash_hex(&value));
    }

    #[test]
    fn test_different_bodies_differ() {
        let a = body_hash_hex(br#"{"qty":5}"#).unwrap();
        let b = body_hash_hex(br#"{"qty":6}"#).unwrap();
        assert_ne!(a, b);
    }
}
