//! Sealgate configuration.

use crate::cache::nonce::{DEFAULT_MAX_NONCES_PER_CLIENT, DEFAULT_NONCE_TTL_SECONDS};
use crate::crypto::freshness::DEFAULT_SKEW_SECONDS;
use crate::crypto::verify::{decode_hmac_key, decode_public_key};
use crate::SealgateError;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default domain separation tag.
pub const DEFAULT_DOMAIN_TAG: &str = "sunex:api:v1";

/// Default request body limit (100 KiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 100 * 1024;

/// Signature scheme a deployment runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningMode {
    /// Ed25519 detached signatures.
    Ed25519,
    /// HMAC-SHA256 over a shared secret.
    Hmac,
}

impl FromStr for SigningMode {
    type Err = SealgateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ed25519" => Ok(Self::Ed25519),
            "hmac" => Ok(Self::Hmac),
            other => Err(SealgateError::ConfigError(format!(
                "Unknown signing mode: {:?} (expected ed25519 or hmac)",
                other
            ))),
        }
    }
}

impl fmt::Display for SigningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ed25519 => f.write_str("ed25519"),
            Self::Hmac => f.write_str("hmac"),
        }
    }
}

/// Key material for the active signing mode.
#[derive(Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    /// Pinned Ed25519 verifying key (base64, 32 bytes).
    Ed25519 {
        /// Base64 public key.
        public_key_b64: String,
    },

    /// Ed25519 with the `x-client` header carrying the base64 verifying key.
    Ed25519ClientKey,

    /// Shared HMAC secret (base64).
    Hmac {
        /// Base64 key.
        key_b64: String,
    },
}

impl KeyMaterial {
    /// The signing mode this key material belongs to.
    pub fn mode(&self) -> SigningMode {
        match self {
            Self::Ed25519 { .. } | Self::Ed25519ClientKey => SigningMode::Ed25519,
            Self::Hmac { .. } => SigningMode::Hmac,
        }
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ed25519 { public_key_b64 } => f
                .debug_struct("Ed25519")
                .field("public_key_b64", public_key_b64)
                .finish(),
            Self::Ed25519ClientKey => f.write_str("Ed25519ClientKey"),
            Self::Hmac { .. } => f
                .debug_struct("Hmac")
                .field("key_b64", &"<redacted>")
                .finish(),
        }
    }
}

/// Configuration for request verification.
#[derive(Debug, Clone)]
pub struct SealgateConfig {
    /// Domain separation tag; must match the signers exactly.
    pub domain_tag: String,

    /// Maximum allowed `|now - timestamp|`.
    pub skew: Duration,

    /// How long a consumed nonce stays live.
    pub nonce_ttl: Duration,

    /// Cap on live nonces per client.
    pub max_nonces_per_client: usize,

    /// Largest request body accepted by HTTP integrations.
    pub max_body_bytes: usize,

    /// Verification key material; selects the signing mode.
    pub keys: KeyMaterial,
}

impl SealgateConfig {
    /// Configuration with default limits around the given key material.
    pub fn new(keys: KeyMaterial) -> Self {
        Self {
            domain_tag: DEFAULT_DOMAIN_TAG.to_string(),
            skew: Duration::from_secs(DEFAULT_SKEW_SECONDS),
            nonce_ttl: Duration::from_secs(DEFAULT_NONCE_TTL_SECONDS),
            max_nonces_per_client: DEFAULT_MAX_NONCES_PER_CLIENT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            keys,
        }
    }

    /// Load configuration from the process environment.
    ///
    /// Recognized variables: `SIGNING_MODE` (default `ed25519`), `SKEW_SECS`,
    /// `NONCE_TTL_SECS`, `NONCE_MAX_PER_CLIENT`, `MAX_BODY_BYTES`,
    /// `DOMAIN_TAG`, `ED25519_PUBKEY_BASE64`, `HMAC_KEY_BASE64`.
    pub fn from_env() -> Result<Self, SealgateError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SealgateError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mode = match var("SIGNING_MODE") {
            Some(raw) => raw.parse()?,
            None => SigningMode::Ed25519,
        };

        let keys = match mode {
            SigningMode::Ed25519 => KeyMaterial::Ed25519 {
                public_key_b64: var("ED25519_PUBKEY_BASE64").ok_or_else(|| {
                    SealgateError::ConfigError(
                        "ED25519_PUBKEY_BASE64 is required in ed25519 mode".to_string(),
                    )
                })?,
            },
            SigningMode::Hmac => KeyMaterial::Hmac {
                key_b64: var("HMAC_KEY_BASE64").ok_or_else(|| {
                    SealgateError::ConfigError(
                        "HMAC_KEY_BASE64 is required in hmac mode".to_string(),
                    )
                })?,
            },
        };

        let mut config = Self::new(keys);

        if let Some(tag) = lookup("DOMAIN_TAG") {
            config.domain_tag = tag;
        }
        if let Some(secs) = parse_var::<u64>(&var, "SKEW_SECS")? {
            config.skew = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&var, "NONCE_TTL_SECS")? {
            config.nonce_ttl = Duration::from_secs(secs);
        }
        if let Some(max) = parse_var::<usize>(&var, "NONCE_MAX_PER_CLIENT")? {
            config.max_nonces_per_client = max;
        }
        if let Some(max) = parse_var::<usize>(&var, "MAX_BODY_BYTES")? {
            config.max_body_bytes = max;
        }

        config.validate()?;
        Ok(config)
    }

    /// The signing mode selected by the key material.
    pub fn signing_mode(&self) -> SigningMode {
        self.keys.mode()
    }

    /// Whether a nonce outlives every timestamp that could carry it.
    ///
    /// A request stays inside the skew window for up to twice the skew after
    /// first acceptance; a shorter TTL lets a verbatim replay through.
    pub fn replay_window_covered(&self) -> bool {
        self.nonce_ttl >= self.skew.saturating_mul(2)
    }

    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), SealgateError> {
        if self.domain_tag.is_empty() {
            return Err(SealgateError::ConfigError(
                "domain_tag cannot be empty".to_string(),
            ));
        }
        if self.nonce_ttl.is_zero() {
            return Err(SealgateError::ConfigError(
                "nonce_ttl must be positive".to_string(),
            ));
        }
        if !self.replay_window_covered() {
            tracing::warn!(
                nonce_ttl_secs = self.nonce_ttl.as_secs(),
                skew_secs = self.skew.as_secs(),
                "nonce TTL shorter than twice the skew window; late replays can pass"
            );
        }
        if self.max_nonces_per_client == 0 {
            return Err(SealgateError::ConfigError(
                "max_nonces_per_client must be positive".to_string(),
            ));
        }
        if self.max_body_bytes == 0 {
            return Err(SealgateError::ConfigError(
                "max_body_bytes must be positive".to_string(),
            ));
        }
        match &self.keys {
            KeyMaterial::Ed25519 { public_key_b64 } => {
                decode_public_key(public_key_b64)?;
            }
            KeyMaterial::Hmac { key_b64 } => {
                decode_hmac_key(key_b64)?;
            }
            KeyMaterial::Ed25519ClientKey => {}
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, SealgateError> {
    var(name)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|_| {
                SealgateError::ConfigError(format!(
                    "{} must be a non-negative integer, got {:?}",
                    name, raw
                ))
            })
        })
        .transpose()
}
