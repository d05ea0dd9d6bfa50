//! Cryptographic primitives for request verification.

pub mod canonical;
pub mod digest;
pub mod freshness;
pub mod signing;
pub mod verify;
