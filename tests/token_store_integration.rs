//! Token store integration tests
//!
//! These tests run the same behavioral checks against the in-memory store and
//! the Vault store, the latter over an in-process secret service that mimics
//! Vault's KV path semantics.

use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokenstore::errors::StorageError;
use tokenstore::storage::{
    MemoryTokenStore, Result, SecretClient, SecretData, TokenStore, VaultTokenStore,
};

/// Flat path → secret map answering like a KV mount.
#[derive(Default)]
struct InProcessSecretService {
    secrets: Mutex<BTreeMap<String, SecretData>>,
}

#[async_trait]
impl SecretClient for InProcessSecretService {
    async fn write(&self, path: &str, data: SecretData) -> Result<()> {
        self.secrets.lock().unwrap().insert(path.to_string(), data);
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<SecretData> {
        self.secrets
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        // KV deletes succeed whether or not the secret exists
        self.secrets.lock().unwrap().remove(path);
        Ok(())
    }

    async fn list(&self, path: &str) -> Result<SecretData> {
        let prefix = format!("{path}/");
        let secrets = self.secrets.lock().unwrap();
        let mut keys = secrets
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .map(|rest| match rest.split_once('/') {
                Some((dir, _)) => format!("{dir}/"),
                None => rest.to_string(),
            })
            .collect::<Vec<_>>();
        keys.dedup();

        if keys.is_empty() {
            return Err(StorageError::NotFound(path.to_string()));
        }
        let mut data = SecretData::new();
        data.insert("keys".to_string(), json!(keys));
        Ok(data)
    }
}

fn backends() -> Vec<(&'static str, Arc<dyn TokenStore>)> {
    let memory: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
    let vault: Arc<dyn TokenStore> =
        Arc::new(VaultTokenStore::new(InProcessSecretService::default()));
    vec![("memory", memory), ("vault", vault)]
}

async fn sorted_list(store: &dyn TokenStore, user_id: &str) -> Vec<String> {
    let mut tokens = store.list(user_id).await.unwrap();
    tokens.sort();
    tokens
}

#[tokio::test]
async fn test_store_then_lookup_returns_token() {
    for (name, store) in backends() {
        store.store("alice", "tok-1").await.unwrap();
        assert_eq!(
            store.lookup("alice", "tok-1").await.unwrap(),
            Some("tok-1".to_string()),
            "backend {name}"
        );
    }
}

#[tokio::test]
async fn test_revoke_then_lookup_is_empty() {
    for (name, store) in backends() {
        // Never stored
        store.revoke("alice", "tok-1").await.unwrap();
        assert_eq!(store.lookup("alice", "tok-1").await.unwrap(), None, "backend {name}");

        // Stored then revoked
        store.store("alice", "tok-1").await.unwrap();
        store.revoke("alice", "tok-1").await.unwrap();
        assert_eq!(store.lookup("alice", "tok-1").await.unwrap(), None, "backend {name}");
    }
}

#[tokio::test]
async fn test_store_is_idempotent() {
    for (name, store) in backends() {
        store.store("alice", "tok-1").await.unwrap();
        store.store("alice", "tok-1").await.unwrap();
        assert_eq!(
            store.list("alice").await.unwrap(),
            vec!["tok-1".to_string()],
            "backend {name}"
        );
    }
}

#[tokio::test]
async fn test_unknown_user_is_empty() {
    for (name, store) in backends() {
        assert_eq!(store.lookup("bob", "x").await.unwrap(), None, "backend {name}");
        assert!(store.list("bob").await.unwrap().is_empty(), "backend {name}");
    }
}

#[tokio::test]
async fn test_alice_scenario() {
    for (name, store) in backends() {
        store.store("alice", "tok-1").await.unwrap();
        assert_eq!(sorted_list(store.as_ref(), "alice").await, vec!["tok-1"], "backend {name}");

        store.store("alice", "tok-2").await.unwrap();
        assert_eq!(
            sorted_list(store.as_ref(), "alice").await,
            vec!["tok-1", "tok-2"],
            "backend {name}"
        );

        store.revoke("alice", "tok-1").await.unwrap();
        assert_eq!(sorted_list(store.as_ref(), "alice").await, vec!["tok-2"], "backend {name}");
        assert_eq!(store.lookup("alice", "tok-1").await.unwrap(), None, "backend {name}");
    }
}

#[tokio::test]
async fn test_revoked_token_can_be_stored_again() {
    for (name, store) in backends() {
        store.store("alice", "tok-1").await.unwrap();
        store.revoke("alice", "tok-1").await.unwrap();
        store.store("alice", "tok-1").await.unwrap();
        assert_eq!(sorted_list(store.as_ref(), "alice").await, vec!["tok-1"], "backend {name}");
    }
}

#[tokio::test]
async fn test_users_do_not_share_tokens() {
    for (name, store) in backends() {
        store.store("alice", "tok-1").await.unwrap();
        store.store("bob", "tok-2").await.unwrap();

        assert_eq!(store.lookup("bob", "tok-1").await.unwrap(), None, "backend {name}");
        assert_eq!(sorted_list(store.as_ref(), "alice").await, vec!["tok-1"], "backend {name}");
        assert_eq!(sorted_list(store.as_ref(), "bob").await, vec!["tok-2"], "backend {name}");
    }
}

#[tokio::test]
async fn test_unaddressable_ids_read_as_empty() {
    for (name, store) in backends() {
        store.store("alice", "tok-1").await.unwrap();

        assert_eq!(store.lookup("", "x").await.unwrap(), None, "backend {name}");
        assert_eq!(store.lookup("alice", "a/b").await.unwrap(), None, "backend {name}");
        assert_eq!(store.lookup("alice", "..").await.unwrap(), None, "backend {name}");
        store.revoke("", "x").await.unwrap();
        store.revoke("alice", "a/b").await.unwrap();
        assert!(store.list("").await.unwrap().is_empty(), "backend {name}");
        assert!(store.list("alice/tok-1").await.unwrap().is_empty(), "backend {name}");
    }
}

#[tokio::test]
async fn test_reserved_url_characters_are_opaque() {
    for (name, store) in backends() {
        for token in ["a#frag", "q?x=1", "a%2Fb"] {
            store.store("alice", token).await.unwrap();
            assert_eq!(
                store.lookup("alice", token).await.unwrap(),
                Some(token.to_string()),
                "backend {name}"
            );
        }
        assert_eq!(store.lookup("alice", "a").await.unwrap(), None, "backend {name}");
        assert_eq!(store.lookup("alice", "q").await.unwrap(), None, "backend {name}");
        assert_eq!(
            sorted_list(store.as_ref(), "alice").await,
            vec!["a#frag", "a%2Fb", "q?x=1"],
            "backend {name}"
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_stores_all_land() {
    for (name, store) in backends() {
        let handles = (0..100)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.store("alice", &format!("tok-{i:03}")).await })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let expected = (0..100).map(|i| format!("tok-{i:03}")).collect::<Vec<_>>();
        assert_eq!(sorted_list(store.as_ref(), "alice").await, expected, "backend {name}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_lookups_and_stores() {
    let store = Arc::new(MemoryTokenStore::new());
    store.store("alice", "stable").await.unwrap();

    let handles = (0..50)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store.store("alice", &format!("tok-{i}")).await.unwrap();
                store.lookup("alice", "stable").await.unwrap()
            })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), Some("stable".to_string()));
    }
    assert_eq!(store.list("alice").await.unwrap().len(), 51);
}

#[cfg(feature = "vault")]
mod vault_http {
    use super::*;
    use tokenstore::storage::{StorageBackend, VaultAuth, VaultConfig, create_storage_backend};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_vault_backend_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/secret/accesstokens/bob/x"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"errors": []})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/secret/accesstokens/bob"))
            .and(query_param("list", "true"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"errors": []})))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v1/secret/accesstokens/bob/x"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"errors": []})))
            .mount(&server)
            .await;

        let config = VaultConfig::new(server.uri(), "secret", VaultAuth::Token("root".to_string()));
        let store = create_storage_backend(StorageBackend::Vault(config))
            .await
            .unwrap();

        assert_eq!(store.lookup("bob", "x").await.unwrap(), None);
        assert!(store.list("bob").await.unwrap().is_empty());
        store.revoke("bob", "x").await.unwrap();
    }

    #[tokio::test]
    async fn test_vault_backend_encodes_ids_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/secret/accesstokens/alice/a%23frag"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/v1/secret/accesstokens/alice/a"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/secret/accesstokens/alice/a%23frag"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"token": "a#frag"}})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/secret/accesstokens/alice/a"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"errors": []})))
            .mount(&server)
            .await;

        let config = VaultConfig::new(server.uri(), "secret", VaultAuth::Token("root".to_string()));
        let store = create_storage_backend(StorageBackend::Vault(config))
            .await
            .unwrap();

        store.store("alice", "a#frag").await.unwrap();
        assert_eq!(
            store.lookup("alice", "a#frag").await.unwrap(),
            Some("a#frag".to_string())
        );
        assert_eq!(store.lookup("alice", "a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_vault_backend_unaddressable_ids_send_nothing() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let config = VaultConfig::new(server.uri(), "secret", VaultAuth::Token("root".to_string()));
        let store = create_storage_backend(StorageBackend::Vault(config))
            .await
            .unwrap();

        assert_eq!(store.lookup("", "x").await.unwrap(), None);
        store.revoke("alice", "a/b").await.unwrap();
        assert!(store.list("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_vault_backend_surfaces_transport_failure() {
        // Nothing listens on port 1
        let config = VaultConfig::new(
            "http://127.0.0.1:1",
            "secret",
            VaultAuth::Token("root".to_string()),
        );
        let store = create_storage_backend(StorageBackend::Vault(config))
            .await
            .unwrap();

        assert!(matches!(
            store.lookup("alice", "tok-1").await,
            Err(StorageError::ConnectionFailed(_))
        ));
    }
}
