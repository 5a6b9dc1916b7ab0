//! Vault-backed storage implementations
//!
//! [`VaultTokenStore`] works against any [`SecretClient`](crate::storage::traits::SecretClient);
//! [`VaultClient`] is the HTTP client for HashiCorp Vault and needs the
//! `vault` feature.

#[cfg(feature = "vault")]
mod client;
mod settings;
mod tokens;

#[cfg(feature = "vault")]
pub use client::VaultClient;
pub use settings::{DEFAULT_KUBERNETES_JWT_PATH, VaultAuth, VaultConfig};
pub use tokens::VaultTokenStore;
