//! Axum middleware gate.
//!
//! ```ignore
//! let gate = Arc::new(VerificationMiddleware::from_env()?);
//! let app = Router::new()
//!     .route("/api/orders", post(create_order))
//!     .route_layer(middleware::from_fn_with_state(gate, require_signature));
//! ```
//!
//! Handlers read the authenticated identity with
//! `Extension<VerifiedRequest>`.

use crate::middleware::VerificationMiddleware;
use crate::protocol::models::{ErrorBody, SignedRequest};
use crate::SealgateError;
use axum::body::{to_bytes, Body};
use axum::extract::{OriginalUri, Request, State};
use axum::http::header::CONTENT_LENGTH;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http_body_util::LengthLimitError;
use std::error::Error as StdError;
use std::sync::Arc;

impl IntoResponse for SealgateError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorBody::new(self.public_message()))).into_response()
    }
}

/// Reject any request that does not carry a valid signature.
///
/// On success the body is re-attached unchanged and the
/// [`VerifiedRequest`](crate::VerifiedRequest) is stored in the request
/// extensions.
pub async fn require_signature(
    State(gate): State<Arc<VerificationMiddleware>>,
    request: Request,
    next: Next,
) -> Response {
    match require_signature_inner(&gate, request, next).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn require_signature_inner(
    gate: &VerificationMiddleware,
    request: Request,
    next: Next,
) -> Result<Response, SealgateError> {
    let limit = gate.max_body_bytes();
    if declared_length(request.headers()).is_some_and(|len| len > limit) {
        return Err(SealgateError::BodyTooLarge { limit });
    }

    // Nested routers strip their prefix from `uri()`; the signature covers the full path.
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.path().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    let (mut parts, body) = request.into_parts();
    let bytes = to_bytes(body, limit).await.map_err(|e| {
        if is_length_limit(&e) {
            SealgateError::BodyTooLarge { limit }
        } else {
            SealgateError::Internal(format!("Failed to read body: {}", e))
        }
    })?;

    let signed = SignedRequest::from_headers(
        parts.method.as_str(),
        path,
        |name| parts.headers.get(name).and_then(|v| v.to_str().ok()),
        bytes.to_vec(),
    );
    let verified = gate.verify(&signed)?;

    parts.extensions.insert(verified);
    let request = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(request).await)
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

fn is_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}
