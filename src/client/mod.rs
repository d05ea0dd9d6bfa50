//! Client side: request signing and a signing HTTP client.

pub mod http;
pub mod signer;
