//! Trait-based token storage with in-memory and Vault backends.

pub mod inmemory;
pub mod traits;
pub mod vault;

// Re-export commonly used types and traits
pub use inmemory::MemoryTokenStore;
pub use traits::*;
pub use vault::{VaultAuth, VaultConfig, VaultTokenStore};

#[cfg(feature = "vault")]
pub use vault::VaultClient;

use crate::errors::StorageError;
use std::sync::Arc;

/// Storage backend configuration and factory
#[derive(Clone, Debug)]
pub enum StorageBackend {
    Memory,
    #[cfg(feature = "vault")]
    Vault(VaultConfig),
}

/// Create a storage backend based on configuration
pub async fn create_storage_backend(
    backend: StorageBackend,
) -> std::result::Result<Arc<dyn TokenStore>, StorageError> {
    match backend {
        StorageBackend::Memory => {
            tracing::info!("using in-memory token store");
            Ok(Arc::new(MemoryTokenStore::new()))
        }
        #[cfg(feature = "vault")]
        StorageBackend::Vault(config) => {
            let client = VaultClient::new(config).await?;
            Ok(Arc::new(VaultTokenStore::new(client)))
        }
    }
}

/// Parse storage backend from configuration string
#[cfg_attr(not(feature = "vault"), allow(unused_variables))]
pub fn parse_storage_backend(
    backend_name: &str,
    vault_config: Option<VaultConfig>,
) -> std::result::Result<StorageBackend, StorageError> {
    match backend_name {
        "memory" => Ok(StorageBackend::Memory),
        #[cfg(feature = "vault")]
        "vault" => {
            let config = vault_config.ok_or_else(|| {
                StorageError::InvalidData("Vault settings required for vault backend".to_string())
            })?;
            Ok(StorageBackend::Vault(config))
        }
        _ => Err(StorageError::InvalidData(format!(
            "Unknown storage backend: {}",
            backend_name
        ))),
    }
}
