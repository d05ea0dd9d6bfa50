//! Reqwest-based HTTP client that signs every request.
//!
//! Each call gets a fresh timestamp and nonce from the wrapped
//! [`RequestSigner`]; the canonical body that was hashed is the body that goes
//! on the wire.

use crate::client::signer::RequestSigner;
use crate::protocol::models::ErrorBody;
use crate::SealgateError;
use reqwest::blocking::{Client, Request, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Successful HTTP response.
#[derive(Debug)]
pub struct SignedResponse {
    /// HTTP status code.
    pub status: u16,

    /// Raw response body.
    pub body: Vec<u8>,
}

impl SignedResponse {
    /// Get the body as a UTF-8 string.
    pub fn body_str(&self) -> Result<&str, SealgateError> {
        std::str::from_utf8(&self.body)
            .map_err(|e| SealgateError::Internal(format!("Invalid UTF-8 in body: {}", e)))
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, SealgateError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| SealgateError::Internal(format!("Invalid JSON in body: {}", e)))
    }
}

/// HTTP client that attaches signature headers to every request.
pub struct SignedClient {
    client: Client,
    signer: RequestSigner,
    base_url: String,
    user_agent: String,
}

impl SignedClient {
    /// Create a client for `base_url` (scheme and host, no trailing path).
    pub fn new(base_url: impl Into<String>, signer: RequestSigner) -> Result<Self, SealgateError> {
        let client = build_client(DEFAULT_TIMEOUT)?;
        Ok(Self {
            client,
            signer,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_agent: build_user_agent(),
        })
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, SealgateError> {
        self.client = build_client(timeout)?;
        Ok(self)
    }

    /// The wrapped signer.
    pub fn signer(&self) -> &RequestSigner {
        &self.signer
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a signed request without sending it.
    ///
    /// `path` is what gets signed, so it must not carry a query string.
    pub fn build_request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Request, SealgateError> {
        let signed = self.signer.sign(method.as_str(), path, body)?;
        let url = format!("{}{}", self.base_url, path);

        let mut builder = self
            .client
            .request(method, &url)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json");
        for (name, value) in signed.pairs() {
            builder = builder.header(name, value);
        }

        builder
            .body(signed.body)
            .build()
            .map_err(|e| SealgateError::Transport(format!("Failed to build request: {}", e)))
    }

    /// Sign and send a request.
    ///
    /// Non-2xx responses become [`SealgateError::Rejected`] carrying the
    /// server's `{error}` message.
    pub fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<SignedResponse, SealgateError> {
        let request = self.build_request(method, path, body)?;
        tracing::debug!(method = %request.method(), path, "sending signed request");

        let response = self
            .client
            .execute(request)
            .map_err(|e| SealgateError::Transport(format!("Request failed: {}", e)))?;

        read_response(response)
    }

    /// Signed `GET`.
    pub fn get(&self, path: &str) -> Result<SignedResponse, SealgateError> {
        self.send(Method::GET, path, None)
    }

    /// Signed `POST` with a JSON body.
    pub fn post(&self, path: &str, body: &Value) -> Result<SignedResponse, SealgateError> {
        self.send(Method::POST, path, Some(body))
    }
}

fn build_client(timeout: Duration) -> Result<Client, SealgateError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| SealgateError::ConfigError(format!("Failed to build HTTP client: {}", e)))
}

fn read_response(response: Response) -> Result<SignedResponse, SealgateError> {
    let status = response.status();
    let body = response
        .bytes()
        .map_err(|e| SealgateError::Transport(format!("Failed to read body: {}", e)))?
        .to_vec();

    if status.is_success() {
        return Ok(SignedResponse {
            status: status.as_u16(),
            body,
        });
    }

    let message = rejection_message(&body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
    tracing::warn!(status = status.as_u16(), %message, "signed request rejected");

    Err(SealgateError::Rejected {
        status: status.as_u16(),
        message,
    })
}

/// Extract the `error` field from a rejection envelope.
fn rejection_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .map(|envelope| envelope.error)
}

/// User-Agent string: `sealgate/<version>`.
pub fn build_user_agent() -> String {
    format!("sealgate/{}", env!("CARGO_PKG_VERSION"))
}
