//! In-memory storage implementations
//!
//! Suitable for development, testing, and single-process deployments that
//! do not need tokens to outlive the process.

mod tokens;

pub use tokens::MemoryTokenStore;
