//! Connection and authentication settings for Vault.

use std::time::Duration;

/// Kubernetes service account token mounted into every pod
pub const DEFAULT_KUBERNETES_JWT_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// How the client authenticates with Vault.
#[derive(Clone)]
pub enum VaultAuth {
    /// Static Vault token (e.g. from `VAULT_TOKEN`)
    Token(String),
    /// Kubernetes service account login against `auth/kubernetes`
    Kubernetes {
        role: String,
        /// Defaults to [`DEFAULT_KUBERNETES_JWT_PATH`] when `None`
        jwt_path: Option<String>,
    },
}

impl std::fmt::Debug for VaultAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token(<redacted>)"),
            Self::Kubernetes { role, jwt_path } => f
                .debug_struct("Kubernetes")
                .field("role", role)
                .field("jwt_path", jwt_path)
                .finish(),
        }
    }
}

/// Connection settings for the Vault client
#[derive(Clone, Debug)]
pub struct VaultConfig {
    pub vault_addr: String,
    pub mount: String,
    pub namespace: Option<String>,
    pub auth: VaultAuth,
    pub timeout: Duration,
    pub user_agent: String,
}

impl VaultConfig {
    pub fn new(vault_addr: impl Into<String>, mount: impl Into<String>, auth: VaultAuth) -> Self {
        Self {
            vault_addr: vault_addr.into(),
            mount: mount.into(),
            namespace: None,
            auth,
            timeout: Duration::from_secs(10),
            user_agent: format!("tokenstore/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_debug_redacts_token() {
        let auth = VaultAuth::Token("hvs.secret".to_string());
        assert!(!format!("{auth:?}").contains("hvs.secret"));
    }

    #[test]
    fn test_config_defaults() {
        let config = VaultConfig::new("http://127.0.0.1:8200", "secret", VaultAuth::Token("t".into()));
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.namespace.is_none());
        assert!(config.user_agent.starts_with("tokenstore/"));
    }
}
