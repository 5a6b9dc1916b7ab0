//! Storage trait definitions for access tokens.
//!
//! Defines the async token store interface shared by the in-memory and
//! Vault-backed registries, and the path-addressed secret client the
//! Vault registry is built on.

use crate::errors::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Result<T> = std::result::Result<T, StorageError>;

/// An opaque access token identifier.
///
/// The registry never interprets `name`; `created_at` is informational only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Token {
    /// Create a token stamped with the current time
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: Some(Utc::now()),
        }
    }
}

impl From<String> for Token {
    fn from(name: String) -> Self {
        Self {
            name,
            created_at: None,
        }
    }
}

/// Trait for storing, resolving, and revoking access tokens per user.
///
/// Tokens form a set within a user: storing twice is a no-op, revoking an
/// absent token succeeds, and unknown users look empty rather than failing.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Add `token_id` to the tokens of `user_id`
    async fn store(&self, user_id: &str, token_id: &str) -> Result<()>;

    /// Return `token_id` if it is stored for `user_id`, `None` otherwise
    async fn lookup(&self, user_id: &str, token_id: &str) -> Result<Option<String>>;

    /// Remove `token_id` from the tokens of `user_id`
    async fn revoke(&self, user_id: &str, token_id: &str) -> Result<()>;

    /// All token ids stored for `user_id`, in no particular order
    async fn list(&self, user_id: &str) -> Result<Vec<String>>;
}

/// Secret payload as returned by a path-addressed secret service.
pub type SecretData = Map<String, Value>;

/// Path-addressed access to an external secret service.
///
/// Implementations report an absent path as [`StorageError::NotFound`].
#[async_trait]
pub trait SecretClient: Send + Sync {
    /// Write `data` at `path`, replacing anything already there
    async fn write(&self, path: &str, data: SecretData) -> Result<()>;

    /// Read the secret stored at `path`
    async fn read(&self, path: &str) -> Result<SecretData>;

    /// Delete the secret stored at `path`
    async fn delete(&self, path: &str) -> Result<()>;

    /// List the children of the directory at `path`
    async fn list(&self, path: &str) -> Result<SecretData>;
}
