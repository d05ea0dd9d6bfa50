//! Sealgate error types.

use thiserror::Error;

/// Errors that can occur while verifying or producing signed requests.
///
/// Verification-path variants map onto the HTTP status and `{error}` message
/// pair that callers see; see [`SealgateError::status_code`] and
/// [`SealgateError::public_message`].
#[derive(Debug, Error)]
pub enum SealgateError {
    /// Configuration is invalid (unknown mode, missing or bad key material).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A signature header is absent, or the timestamp is not a usable number.
    #[error("Signed request headers missing or malformed")]
    MissingHeaders,

    /// Request timestamp is outside the permitted skew window.
    #[error("Request timestamp off by {skew_seconds}s, outside the skew window")]
    ClockSkew {
        /// Signed difference `now - timestamp` in seconds.
        skew_seconds: i64,
    },

    /// Nonce is still live for this client.
    #[error("Nonce already used by this client")]
    Replay,

    /// Request body is not valid JSON.
    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    /// Request body exceeds the configured limit.
    #[error("Request body exceeds {limit} bytes")]
    BodyTooLarge {
        /// Configured limit in bytes.
        limit: usize,
    },

    /// Signature verification failed.
    #[error("Request signature verification failed")]
    SignatureInvalid,

    /// Unexpected failure inside the verification path.
    #[error("Verification failure: {0}")]
    Internal(String),

    /// HTTP transport error on the signing client.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server rejected a signed request.
    #[error("Request rejected ({status}): {message}")]
    Rejected {
        /// HTTP status returned by the server.
        status: u16,
        /// The `error` field of the server's envelope.
        message: String,
    },
}

impl SealgateError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingHeaders | Self::ClockSkew { .. } | Self::MalformedBody(_) => 400,
            Self::SignatureInvalid => 401,
            Self::Replay => 409,
            Self::BodyTooLarge { .. } => 413,
            Self::ConfigError(_) | Self::Internal(_) => 500,
            Self::Transport(_) => 502,
            Self::Rejected { status, .. } => *status,
        }
    }

    /// The message placed in the `{error}` response envelope.
    ///
    /// Deliberately coarse: internal detail stays in logs.
    pub fn public_message(&self) -> &str {
        match self {
            Self::MissingHeaders => "missing headers",
            Self::ClockSkew { .. } => "clock skew",
            Self::Replay => "replay",
            Self::MalformedBody(_) => "malformed body",
            Self::BodyTooLarge { .. } => "payload too large",
            Self::SignatureInvalid => "bad signature",
            Self::ConfigError(_) => "bad server config",
            Self::Internal(_) => "verification failure",
            Self::Transport(_) => "transport error",
            Self::Rejected { message, .. } => message,
        }
    }

    /// Whether this error indicates a server-side defect rather than a bad request.
    pub fn is_server_fault(&self) -> bool {
        matches!(self, Self::ConfigError(_) | Self::Internal(_))
    }
}
