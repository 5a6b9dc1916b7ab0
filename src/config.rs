//! Environment-based configuration for the token store.

use anyhow::Result;
use std::time::Duration;

use crate::errors::ConfigError;
use crate::storage::{StorageBackend, VaultAuth, VaultConfig, parse_storage_backend};

/// Storage backend name (`memory` or `vault`)
#[derive(Clone, Debug)]
pub struct BackendName(String);

/// HTTP client timeout for secret service requests
#[derive(Clone, Debug)]
pub struct HttpClientTimeout(Duration);

/// Vault mount the token paths live under
#[derive(Clone, Debug)]
pub struct VaultMount(String);

/// Main application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub version: String,
    pub backend: BackendName,
    pub vault_addr: String,
    pub vault_token: Option<String>,
    pub vault_role: String,
    pub vault_jwt_path: Option<String>,
    pub vault_mount: VaultMount,
    pub vault_namespace: Option<String>,
    pub http_client_timeout: HttpClientTimeout,
    pub user_agent: String,
}

impl Config {
    /// Create a new configuration from environment variables
    pub fn new() -> Result<Self> {
        let version = version()?;
        let default_user_agent = format!("tokenstore/{version}");
        let backend: BackendName = default_env("TOKEN_STORE_BACKEND", "memory").try_into()?;
        let vault_addr = default_env("VAULT_ADDR", "http://127.0.0.1:8200");
        let vault_token = optional_env("VAULT_TOKEN").filter(|s| !s.is_empty());
        let vault_role = default_env("VAULT_ROLE", "pipeline");
        let vault_jwt_path = optional_env("VAULT_JWT_PATH").filter(|s| !s.is_empty());
        let vault_mount: VaultMount = default_env("VAULT_MOUNT", "secret").try_into()?;
        let vault_namespace = optional_env("VAULT_NAMESPACE").filter(|s| !s.is_empty());
        let http_client_timeout: HttpClientTimeout =
            default_env("HTTP_CLIENT_TIMEOUT", "10s").try_into()?;
        let user_agent = default_env("USER_AGENT", &default_user_agent);

        Ok(Self {
            version,
            backend,
            vault_addr,
            vault_token,
            vault_role,
            vault_jwt_path,
            vault_mount,
            vault_namespace,
            http_client_timeout,
            user_agent,
        })
    }

    /// Override the backend chosen by `TOKEN_STORE_BACKEND`
    pub fn with_backend(mut self, backend: &str) -> Result<Self> {
        self.backend = backend.to_string().try_into()?;
        Ok(self)
    }

    /// Vault connection settings; a static `VAULT_TOKEN` wins over Kubernetes login
    pub fn vault_config(&self) -> VaultConfig {
        let auth = match &self.vault_token {
            Some(token) => VaultAuth::Token(token.clone()),
            None => VaultAuth::Kubernetes {
                role: self.vault_role.clone(),
                jwt_path: self.vault_jwt_path.clone(),
            },
        };

        let mut config = VaultConfig::new(&self.vault_addr, self.vault_mount.as_ref(), auth);
        config.namespace = self.vault_namespace.clone();
        config.timeout = *self.http_client_timeout.as_ref();
        config.user_agent = self.user_agent.clone();
        config
    }

    /// Resolve the configured backend
    pub fn storage_backend(&self) -> Result<StorageBackend> {
        let vault_config = (self.backend.as_ref() == "vault").then(|| self.vault_config());
        Ok(parse_storage_backend(self.backend.as_ref(), vault_config)?)
    }
}

/// Get application version from build environment
pub fn version() -> Result<String> {
    option_env!("GIT_HASH")
        .or(option_env!("CARGO_PKG_VERSION"))
        .map(|val| val.to_string())
        .ok_or(ConfigError::VersionNotSet.into())
}

pub(crate) fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn default_env(name: &str, default_value: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default_value.to_string())
}

impl TryFrom<String> for BackendName {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let value = value.trim().to_lowercase();
        match value.as_str() {
            "" => Ok(Self("memory".to_string())),
            "memory" | "vault" => Ok(Self(value)),
            _ => Err(ConfigError::UnknownBackend(value)),
        }
    }
}

impl AsRef<str> for BackendName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for HttpClientTimeout {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Ok(Self(Duration::from_secs(10)));
        }

        duration_str::parse(&value)
            .map(Self)
            .map_err(|e| ConfigError::DurationParsingFailed(value, e.to_string()))
    }
}

impl AsRef<Duration> for HttpClientTimeout {
    fn as_ref(&self) -> &Duration {
        &self.0
    }
}

impl TryFrom<String> for VaultMount {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let mount = value.trim().trim_matches('/');
        if mount.is_empty() {
            return Err(ConfigError::EnvVarRequired("VAULT_MOUNT".to_string()));
        }
        Ok(Self(mount.to_string()))
    }
}

impl AsRef<str> for VaultMount {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
