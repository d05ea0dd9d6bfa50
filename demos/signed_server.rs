//! Minimal API protected by the signature gate.
//!
//! # Running
//!
//! ```bash
//! export ED25519_PUBKEY_BASE64="<client public key>"
//! RUST_LOG=sealgate=debug cargo run --example signed_server --features axum
//! ```
//!
//! `/api/health` is open; `POST /api/orders` requires a signed request and
//! echoes the authenticated client id.

use axum::routing::{get, post};
use axum::{middleware, Extension, Json, Router};
use sealgate::{require_signature, VerificationMiddleware, VerifiedRequest};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn create_order(
    Extension(verified): Extension<VerifiedRequest>,
    Json(order): Json<Value>,
) -> Json<Value> {
    tracing::info!(client = %verified.client_id, "order accepted");
    Json(json!({ "client": verified.client_id, "order": order }))
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Fail fast: a server with bad key material must not start.
    let gate = match VerificationMiddleware::from_env() {
        Ok(gate) => Arc::new(gate),
        Err(e) => {
            tracing::error!(error = %e, "cannot start without valid signing config");
            std::process::exit(1);
        }
    };

    let app = Router::new()
        .route("/api/orders", post(create_order))
        .route_layer(middleware::from_fn_with_state(gate, require_signature))
        .route("/api/health", get(health));

    let addr = SocketAddr::from(([127, 0, 0, 1], 8080));
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "bind failed");
            std::process::exit(1);
        }
    };

    tracing::info!("Listening on {}", addr);
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
