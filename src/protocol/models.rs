//! Wire-level request envelope, header names, and response bodies.

use serde::{Deserialize, Serialize};

/// Client identity header (client id, or base64 Ed25519 public key).
pub const HEADER_CLIENT: &str = "x-client";

/// Unix-seconds timestamp header.
pub const HEADER_TIMESTAMP: &str = "x-timestamp";

/// Per-request nonce header.
pub const HEADER_NONCE: &str = "x-nonce";

/// Base64 signature header.
pub const HEADER_SIGNATURE: &str = "x-sig";

/// A request as seen by the verifier. Lives for one request.
#[derive(Debug, Clone, Default)]
pub struct SignedRequest {
    /// HTTP method.
    pub method: String,

    /// Request path without query string.
    pub path: String,

    /// `x-client` header value.
    pub client: Option<String>,

    /// `x-timestamp` header value.
    pub timestamp: Option<String>,

    /// `x-nonce` header value.
    pub nonce: Option<String>,

    /// `x-sig` header value.
    pub signature: Option<String>,

    /// Raw request body.
    pub body: Vec<u8>,
}

impl SignedRequest {
    /// Start a request with no signature headers.
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    /// Build a request, pulling the signature headers through `header`.
    ///
    /// `header` should look names up case-insensitively, as HTTP header maps do.
    pub fn from_headers<'h, F>(
        method: impl Into<String>,
        path: impl Into<String>,
        header: F,
        body: impl Into<Vec<u8>>,
    ) -> Self
    where
        F: Fn(&str) -> Option<&'h str>,
    {
        Self {
            client: header(HEADER_CLIENT).map(String::from),
            timestamp: header(HEADER_TIMESTAMP).map(String::from),
            nonce: header(HEADER_NONCE).map(String::from),
            signature: header(HEADER_SIGNATURE).map(String::from),
            ..Self::new(method, path, body)
        }
    }

    /// Set one header by name (ASCII case-insensitive). Unknown names are ignored.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = Some(value.into());
        if name.eq_ignore_ascii_case(HEADER_CLIENT) {
            self.client = value;
        } else if name.eq_ignore_ascii_case(HEADER_TIMESTAMP) {
            self.timestamp = value;
        } else if name.eq_ignore_ascii_case(HEADER_NONCE) {
            self.nonce = value;
        } else if name.eq_ignore_ascii_case(HEADER_SIGNATURE) {
            self.signature = value;
        }
        self
    }

    /// Set every header from an iterator of `(name, value)` pairs.
    pub fn with_headers<I, K, V>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        headers
            .into_iter()
            .fold(self, |req, (name, value)| req.with_header(name.as_ref(), value))
    }

    /// Body as UTF-8, if it is.
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// Identity established by a successfully verified request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedRequest {
    /// The authenticated `x-client` value.
    pub client_id: String,

    /// The consumed nonce.
    pub nonce: String,

    /// The signed timestamp.
    pub timestamp: i64,

    /// SHA-256 hex of the canonical body that was signed.
    pub body_hash_hex: String,
}

/// JSON error envelope returned on rejection: `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Public error message.
    pub error: String,
}

impl ErrorBody {
    /// Create an envelope for a message.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
