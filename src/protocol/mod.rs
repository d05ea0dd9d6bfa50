//! Request envelope and wire types.

pub mod models;
