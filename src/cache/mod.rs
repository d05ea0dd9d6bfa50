//! In-memory replay-protection state.

pub mod nonce;
