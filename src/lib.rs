//! Access token registry library crate.
//!
//! Keeps a set of opaque access token ids per user behind the
//! [`TokenStore`](storage::TokenStore) trait, with an in-memory backend and a
//! HashiCorp Vault backend selected once at construction.

pub mod config;
pub mod errors;
pub mod storage;
