//! In-memory access token storage implementation
//!
//! Tokens live only for the lifetime of the owning [`MemoryTokenStore`].

use crate::storage::traits::{Result, TokenStore};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory token store (thread-safe)
///
/// `store`, `revoke` and `list` hold the write lock; `lookup` shares the
/// read lock. The lock is never held across an `.await`.
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<HashMap<String, HashSet<String>>>,
}

impl MemoryTokenStore {
    /// Create a new memory token storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of tokens across all users
    pub fn len(&self) -> usize {
        self.read().values().map(HashSet::len).sum()
    }

    /// Return `true` if no user has any token
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A panic while holding the lock cannot leave a map or set half-updated,
    // so a poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, HashSet<String>>> {
        self.tokens.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, HashSet<String>>> {
        self.tokens.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn store(&self, user_id: &str, token_id: &str) -> Result<()> {
        tracing::debug!(user_id, token_id, "storing token in memory");
        self.write()
            .entry(user_id.to_string())
            .or_default()
            .insert(token_id.to_string());
        Ok(())
    }

    async fn lookup(&self, user_id: &str, token_id: &str) -> Result<Option<String>> {
        let tokens = self.read();
        Ok(tokens
            .get(user_id)
            .and_then(|user_tokens| user_tokens.get(token_id))
            .cloned())
    }

    async fn revoke(&self, user_id: &str, token_id: &str) -> Result<()> {
        tracing::debug!(user_id, token_id, "revoking token in memory");
        let mut tokens = self.write();
        if let Some(user_tokens) = tokens.get_mut(user_id) {
            user_tokens.remove(token_id);
            if user_tokens.is_empty() {
                tokens.remove(user_id);
            }
        }
        Ok(())
    }

    async fn list(&self, user_id: &str) -> Result<Vec<String>> {
        let tokens = self.write();
        Ok(tokens
            .get(user_id)
            .map(|user_tokens| user_tokens.iter().cloned().collect())
            .unwrap_or_default())
    }
}
