//! Core abstractions for claimtrack: claim/document entities and the
//! attachment vault contract. This crate is intentionally small to keep
//! dependency surface minimal.

pub mod claims;
pub mod vault;
