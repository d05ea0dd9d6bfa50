//! Optional web framework integrations.

#[cfg(feature = "axum")]
pub mod axum;
