//! # Sealgate
//!
//! **Signed-request authentication for JSON HTTP APIs.**
//!
//! Every protected request carries four headers: `x-client`, `x-timestamp`,
//! `x-nonce`, and `x-sig`. The signature covers a pipe-joined preimage of the
//! domain tag, method, path, SHA-256 of the canonical JSON body, timestamp,
//! and nonce. Sealgate verifies that preimage with Ed25519 or HMAC-SHA256 and
//! refuses replays with a per-client nonce cache.
//!
//! ## Features
//!
//! - **Canonical JSON hashing**: key order and whitespace never change the body hash
//! - **Ed25519 or HMAC-SHA256**: pinned public key, client-supplied key, or shared secret
//! - **Replay protection**: per-client nonce cache with TTL and bounded memory
//! - **Clock skew window**: stale and far-future timestamps rejected
//! - **Fail-closed**: missing headers, bad config, or internal errors never pass a request
//!
//! ## Quickstart
//!
//! ```no_run
//! use sealgate::{Decision, SignedRequest, VerificationMiddleware};
//!
//! fn main() -> Result<(), sealgate::SealgateError> {
//!     // Reads SIGNING_MODE, ED25519_PUBKEY_BASE64 / HMAC_KEY_BASE64, SKEW_SECS, ...
//!     let gate = VerificationMiddleware::from_env()?;
//!
//!     let request = SignedRequest::new("POST", "/api/orders", br#"{"qty":1}"#.to_vec())
//!         .with_header("x-client", "desk-7")
//!         .with_header("x-timestamp", "1736942400")
//!         .with_header("x-nonce", "bm9uY2U=")
//!         .with_header("x-sig", "c2lnbmF0dXJl");
//!
//!     match gate.decide(&request) {
//!         Decision::Accept(verified) => println!("hello {}", verified.client_id),
//!         Decision::Reject { status, body } => println!("{} {}", status, body.error),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Threat Model
//!
//! Sealgate protects against:
//! - **Tampering**: any change to method, path, body, timestamp, or nonce breaks the signature
//! - **Replay**: a nonce is accepted once per client within its TTL
//! - **Cross-service reuse**: the domain tag binds signatures to one API
//!
//! Nonces are consumed before the signature is checked, so an attacker who
//! observes a nonce can burn it. Nonce state is in memory and per process.
//!
//! ## Configuration
//!
//! See [`SealgateConfig`] for environment variables and defaults.

#![deny(warnings)]
#![deny(missing_docs)]
#![doc(html_root_url = "https://docs.rs/sealgate/0.1.0")]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;

// Crypto layer
pub mod crypto;

// Protocol layer
pub mod protocol;

// Replay state
pub mod cache;

// Server side
pub mod middleware;

// Client side
pub mod client;

// Optional integrations
pub mod integrations;

// Re-exports for public API
pub use cache::nonce::NonceCache;
pub use client::http::SignedClient;
pub use client::signer::{RequestSigner, SignedHeaders};
pub use clock::{Clock, SystemClock};
pub use config::{KeyMaterial, SealgateConfig, SigningMode};
pub use errors::SealgateError;
pub use middleware::{Decision, VerificationMiddleware};
pub use protocol::models::{ErrorBody, SignedRequest, VerifiedRequest};

#[cfg(feature = "axum")]
pub use integrations::axum::require_signature;

#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
