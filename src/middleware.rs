//! Verification middleware - the accept/reject gate for signed requests.
//!
//! Each request runs through a fixed sequence; the first failing step decides
//! the rejection:
//! 1. Extract `x-client`, `x-timestamp`, `x-nonce`, `x-sig` (400 `missing headers`)
//! 2. Check clock skew (400 `clock skew`)
//! 3. Consume the nonce (409 `replay`)
//! 4. Canonicalize and hash the body (400 `malformed body`)
//! 5. Build the preimage
//! 6. Verify the signature (401 `bad signature`)
//!
//! The nonce is consumed in step 3, before the signature is checked, so a
//! request that later fails verification has still burned its nonce.

use crate::cache::nonce::NonceCache;
use crate::clock::{Clock, SystemClock};
use crate::config::{SealgateConfig, SigningMode};
use crate::crypto::{
    digest::body_hash_hex,
    freshness::{check_skew, parse_timestamp},
    signing::{build_preimage, PreimageFields},
    verify::{build_verifier, SignatureVerifier},
};
use crate::protocol::models::{ErrorBody, SignedRequest, VerifiedRequest};
use crate::SealgateError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of gating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Forward to the next handler.
    Accept(VerifiedRequest),

    /// Answer with `status` and the JSON `body`.
    Reject {
        /// HTTP status code.
        status: u16,
        /// `{"error": ...}` envelope.
        body: ErrorBody,
    },
}

impl Decision {
    /// Whether the request was accepted.
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept(_))
    }
}

/// Request verifier composing skew, replay and signature checks.
///
/// Create one per deployment and share it (`Arc`) across request handlers.
pub struct VerificationMiddleware {
    domain_tag: String,
    skew: Duration,
    max_body_bytes: usize,
    nonces: Arc<NonceCache>,
    verifier: Box<dyn SignatureVerifier>,
    clock: Arc<dyn Clock>,
}

impl VerificationMiddleware {
    /// Create a middleware with its own nonce cache, on the system clock.
    ///
    /// # Errors
    /// * `ConfigError` - configuration or key material is invalid
    pub fn new(config: &SealgateConfig) -> Result<Self, SealgateError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let nonces = Arc::new(NonceCache::with_clock(
            config.nonce_ttl,
            config.max_nonces_per_client,
            clock.clone(),
        ));
        Self::with_clock(config, nonces, clock)
    }

    /// Create a middleware sharing an existing nonce cache.
    pub fn with_nonce_cache(
        config: &SealgateConfig,
        nonces: Arc<NonceCache>,
    ) -> Result<Self, SealgateError> {
        Self::with_clock(config, nonces, Arc::new(SystemClock))
    }

    /// Create a middleware on a custom clock.
    pub fn with_clock(
        config: &SealgateConfig,
        nonces: Arc<NonceCache>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SealgateError> {
        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "refusing to build verification middleware");
            return Err(e);
        }

        let verifier = build_verifier(&config.keys)?;
        tracing::info!(
            mode = %verifier.mode(),
            domain_tag = %config.domain_tag,
            skew_secs = config.skew.as_secs(),
            "request verification enabled"
        );

        Ok(Self {
            domain_tag: config.domain_tag.clone(),
            skew: config.skew,
            max_body_bytes: config.max_body_bytes,
            nonces,
            verifier,
            clock,
        })
    }

    /// Build from environment variables (see [`SealgateConfig::from_env`]).
    pub fn from_env() -> Result<Self, SealgateError> {
        let config = SealgateConfig::from_env().map_err(|e| {
            tracing::error!(error = %e, "invalid verification configuration");
            e
        })?;
        Self::new(&config)
    }

    /// Verify a request, consuming its nonce.
    ///
    /// # Errors
    /// * `MissingHeaders` - a signature header is absent/empty, or the timestamp is unusable
    /// * `ClockSkew` - timestamp outside the skew window
    /// * `Replay` - nonce is live for this client
    /// * `MalformedBody` - body is not JSON
    /// * `SignatureInvalid` - signature does not verify
    pub fn verify(&self, request: &SignedRequest) -> Result<VerifiedRequest, SealgateError> {
        let outcome = self.run_checks(request);

        match &outcome {
            Ok(verified) => tracing::debug!(
                client = %verified.client_id,
                method = %request.method,
                path = %request.path,
                "signed request accepted"
            ),
            Err(e) if e.is_server_fault() => tracing::error!(
                error = %e,
                method = %request.method,
                path = %request.path,
                "signed request verification failed internally"
            ),
            Err(e) => tracing::warn!(
                client = request.client.as_deref().unwrap_or("-"),
                status = e.status_code(),
                reason = e.public_message(),
                method = %request.method,
                path = %request.path,
                "signed request rejected"
            ),
        }

        outcome
    }

    /// Verify a request and fold the result into an accept/reject decision.
    pub fn decide(&self, request: &SignedRequest) -> Decision {
        match self.verify(request) {
            Ok(verified) => Decision::Accept(verified),
            Err(e) => Decision::Reject {
                status: e.status_code(),
                body: ErrorBody::new(e.public_message()),
            },
        }
    }

    fn run_checks(&self, request: &SignedRequest) -> Result<VerifiedRequest, SealgateError> {
        // 1. Headers
        let (Some(client), Some(timestamp), Some(nonce), Some(signature)) = (
            present(&request.client),
            present(&request.timestamp),
            present(&request.nonce),
            present(&request.signature),
        ) else {
            return Err(SealgateError::MissingHeaders);
        };
        let timestamp = parse_timestamp(timestamp)?;

        // 2. Freshness
        check_skew(timestamp, self.skew, self.clock.as_ref())?;

        // 3. Replay; consumes the nonce
        if !self.nonces.check_and_store(client, nonce) {
            return Err(SealgateError::Replay);
        }

        // 4. Body
        let body_hash_hex = body_hash_hex(&request.body)?;

        // 5. Preimage
        let preimage = build_preimage(&PreimageFields {
            domain_tag: &self.domain_tag,
            method: &request.method,
            path: &request.path,
            body_hash_hex: &body_hash_hex,
            timestamp,
            nonce,
        });

        // 6. Signature
        if !self.verifier.verify(&preimage, signature, client) {
            return Err(SealgateError::SignatureInvalid);
        }

        Ok(VerifiedRequest {
            client_id: client.to_string(),
            nonce: nonce.to_string(),
            timestamp,
            body_hash_hex,
        })
    }

    /// Active signing mode.
    pub fn signing_mode(&self) -> SigningMode {
        self.verifier.mode()
    }

    /// Domain tag bound into every preimage.
    pub fn domain_tag(&self) -> &str {
        &self.domain_tag
    }

    /// Body size limit for HTTP integrations.
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }
}

impl fmt::Debug for VerificationMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationMiddleware")
            .field("mode", &self.verifier.mode())
            .field("domain_tag", &self.domain_tag)
            .field("skew", &self.skew)
            .field("nonces", &self.nonces)
            .finish()
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
