//! Vault-backed access token storage.
//!
//! Token → secret path mapping:
//! ```text
//! store/lookup/revoke(alice, tok-1)  →  accesstokens/alice/tok-1   {"token": "tok-1"}
//! list(alice)                        →  accesstokens/alice         {"keys": [...]}
//! ```

use crate::errors::StorageError;
use crate::storage::traits::{Result, SecretClient, SecretData, TokenStore};
use async_trait::async_trait;
use serde_json::Value;

const TOKEN_PREFIX: &str = "accesstokens";
const TOKEN_FIELD: &str = "token";
const KEYS_FIELD: &str = "keys";

/// [`TokenStore`] that keeps every token as a secret in an external service.
///
/// Holds no state and takes no locks: the secret service is the system of
/// record and orders concurrent requests itself.
pub struct VaultTokenStore<C> {
    client: C,
}

impl<C: SecretClient> VaultTokenStore<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

/// Translate the secret service's "absent" signal into an empty result.
///
/// This is the only place `StorageError::NotFound` is interpreted, so both
/// registries share the same not-found contract.
pub(crate) fn absent_as_none<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(StorageError::NotFound(_)) => Ok(None),
        Err(err) => Err(err),
    }
}

fn path_segment<'a>(kind: &str, value: &'a str) -> Result<&'a str> {
    if value.is_empty() {
        return Err(StorageError::InvalidData(format!("{kind} must not be empty")));
    }
    if value.contains('/') || value == "." || value == ".." {
        return Err(StorageError::InvalidData(format!(
            "{kind} is not a valid path segment: {value}"
        )));
    }
    Ok(value)
}

fn user_path(user_id: &str) -> Result<String> {
    Ok(format!(
        "{TOKEN_PREFIX}/{}",
        path_segment("user id", user_id)?
    ))
}

fn token_path(user_id: &str, token_id: &str) -> Result<String> {
    Ok(format!(
        "{}/{}",
        user_path(user_id)?,
        path_segment("token id", token_id)?
    ))
}

fn token_field(secret: &SecretData, path: &str) -> Result<String> {
    secret
        .get(TOKEN_FIELD)
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| StorageError::MalformedResponse(format!("missing .{TOKEN_FIELD} at {path}")))
}

fn listed_keys(listing: &SecretData, path: &str) -> Result<Vec<String>> {
    let keys = listing
        .get(KEYS_FIELD)
        .and_then(Value::as_array)
        .ok_or_else(|| StorageError::MalformedResponse(format!("missing .{KEYS_FIELD} at {path}")))?;

    let mut tokens = Vec::with_capacity(keys.len());
    for key in keys {
        let key = key.as_str().ok_or_else(|| {
            StorageError::MalformedResponse(format!("non-string entry in .{KEYS_FIELD} at {path}"))
        })?;
        // Sub-directories are listed with a trailing slash
        if !key.ends_with('/') {
            tokens.push(key.to_string());
        }
    }
    Ok(tokens)
}

#[async_trait]
impl<C: SecretClient> TokenStore for VaultTokenStore<C> {
    async fn store(&self, user_id: &str, token_id: &str) -> Result<()> {
        let path = token_path(user_id, token_id)?;
        tracing::debug!(user_id, token_id, "storing token in vault");

        let mut data = SecretData::new();
        data.insert(TOKEN_FIELD.to_string(), Value::String(token_id.to_string()));
        self.client.write(&path, data).await
    }

    async fn lookup(&self, user_id: &str, token_id: &str) -> Result<Option<String>> {
        // Ids that cannot form a path were never stored
        let Ok(path) = token_path(user_id, token_id) else {
            return Ok(None);
        };
        absent_as_none(self.client.read(&path).await)?
            .map(|secret| token_field(&secret, &path))
            .transpose()
    }

    async fn revoke(&self, user_id: &str, token_id: &str) -> Result<()> {
        let Ok(path) = token_path(user_id, token_id) else {
            return Ok(());
        };
        tracing::debug!(user_id, token_id, "revoking token in vault");

        absent_as_none(self.client.delete(&path).await)?;
        Ok(())
    }

    async fn list(&self, user_id: &str) -> Result<Vec<String>> {
        let Ok(path) = user_path(user_id) else {
            return Ok(Vec::new());
        };
        match absent_as_none(self.client.list(&path).await)? {
            Some(listing) => listed_keys(&listing, &path),
            None => Ok(Vec::new()),
        }
    }
}
