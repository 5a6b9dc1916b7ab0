//! HashiCorp Vault client for the logical (KV) secrets API.
//!
//! Paths are resolved relative to a mount, one percent-encoded URL segment
//! per `/`-separated path segment:
//! ```text
//! accesstokens/alice/tok-1   →  {vault_addr}/v1/{mount}/accesstokens/alice/tok-1
//! accesstokens/alice/a#frag  →  {vault_addr}/v1/{mount}/accesstokens/alice/a%23frag
//! ```

use crate::errors::StorageError;
use crate::storage::traits::{Result, SecretClient, SecretData};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde_json::Value;

use super::settings::{DEFAULT_KUBERNETES_JWT_PATH, VaultAuth, VaultConfig};

/// [`SecretClient`] speaking the Vault HTTP API.
///
/// The client authenticates once when constructed and performs no retries;
/// concurrent requests are ordered by Vault itself.
pub struct VaultClient {
    http: Client,
    base: Url,
    mount: String,
    namespace: Option<String>,
    token: String,
}

impl VaultClient {
    /// Create a new client and authenticate with Vault.
    ///
    /// For [`VaultAuth::Token`] no network call is made.
    pub async fn new(config: VaultConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .build()
            .map_err(|e| StorageError::ConnectionFailed(format!("Failed to build HTTP client: {e}")))?;
        let vault_addr = config.vault_addr.trim_end_matches('/').to_string();
        let base = Url::parse(&vault_addr)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| {
                StorageError::ConnectionFailed(format!("Invalid Vault address: {vault_addr}"))
            })?;

        let token = authenticate(&http, &vault_addr, config.namespace.as_deref(), &config.auth).await?;
        tracing::info!(vault_addr = %vault_addr, mount = %config.mount, auth = ?config.auth, "connected to vault");

        Ok(Self {
            http,
            base,
            mount: config.mount.trim_matches('/').to_string(),
            namespace: config.namespace,
            token,
        })
    }

    /// Resolve `path` under the mount.
    ///
    /// Each segment is pushed separately so that `#`, `?` and `%` inside an
    /// id are percent-encoded instead of ending the path.
    fn url(&self, path: &str) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| {
                StorageError::ConnectionFailed(format!("Invalid Vault address: {}", self.base))
            })?
            .pop_if_empty()
            .push("v1")
            .extend(self.mount.split('/'))
            .extend(path.split('/'));
        Ok(url)
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header("X-Vault-Token", &self.token);
        match &self.namespace {
            Some(namespace) => builder.header("X-Vault-Namespace", namespace),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, path: &str) -> Result<Response> {
        let resp = self.request(builder).send().await.map_err(|e| {
            StorageError::ConnectionFailed(format!("Vault request for {path} failed: {e}"))
        })?;
        check_status(resp, path).await
    }
}

#[async_trait]
impl SecretClient for VaultClient {
    async fn write(&self, path: &str, data: SecretData) -> Result<()> {
        let builder = self.http.put(self.url(path)?).json(&data);
        self.send(builder, path).await?;
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<SecretData> {
        let resp = self.send(self.http.get(self.url(path)?), path).await?;
        secret_data(resp, path).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.send(self.http.delete(self.url(path)?), path).await?;
        Ok(())
    }

    async fn list(&self, path: &str) -> Result<SecretData> {
        let mut url = self.url(path)?;
        url.query_pairs_mut().append_pair("list", "true");
        let resp = self.send(self.http.get(url), path).await?;
        secret_data(resp, path).await
    }
}

async fn check_status(resp: Response, path: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let errors = parse_vault_errors(resp).await;
    match status {
        StatusCode::NOT_FOUND => Err(StorageError::NotFound(path.to_string())),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(
            StorageError::AuthenticationFailed(format!("{path}: {}", errors.join(", "))),
        ),
        _ => Err(StorageError::RequestFailed {
            status: status.as_u16(),
            errors,
        }),
    }
}

async fn parse_vault_errors(resp: Response) -> Vec<String> {
    resp.json::<Value>()
        .await
        .ok()
        .and_then(|v| {
            v.get("errors")?.as_array().map(|arr| {
                arr.iter()
                    .filter_map(|e| e.as_str().map(String::from))
                    .collect()
            })
        })
        .unwrap_or_default()
}

async fn secret_data(resp: Response, path: &str) -> Result<SecretData> {
    let json: Value = resp.json().await.map_err(|e| {
        StorageError::MalformedResponse(format!("Vault response for {path} is not JSON: {e}"))
    })?;
    match json {
        Value::Object(mut body) => match body.remove("data") {
            Some(Value::Object(data)) => Ok(data),
            _ => Err(StorageError::MalformedResponse(format!(
                "missing .data in Vault response for {path}"
            ))),
        },
        _ => Err(StorageError::MalformedResponse(format!(
            "Vault response for {path} is not an object"
        ))),
    }
}

async fn authenticate(
    http: &Client,
    vault_addr: &str,
    namespace: Option<&str>,
    auth: &VaultAuth,
) -> Result<String> {
    match auth {
        VaultAuth::Token(token) => Ok(token.clone()),
        VaultAuth::Kubernetes { role, jwt_path } => {
            let jwt_path = jwt_path.as_deref().unwrap_or(DEFAULT_KUBERNETES_JWT_PATH);
            let jwt = tokio::fs::read_to_string(jwt_path).await.map_err(|e| {
                StorageError::AuthenticationFailed(format!(
                    "Unable to read service account token {jwt_path}: {e}"
                ))
            })?;
            kubernetes_login(http, vault_addr, namespace, role, jwt.trim()).await
        }
    }
}

async fn kubernetes_login(
    http: &Client,
    vault_addr: &str,
    namespace: Option<&str>,
    role: &str,
    jwt: &str,
) -> Result<String> {
    let url = format!("{vault_addr}/v1/auth/kubernetes/login");
    let mut builder = http
        .post(&url)
        .json(&serde_json::json!({"role": role, "jwt": jwt}));
    if let Some(namespace) = namespace {
        builder = builder.header("X-Vault-Namespace", namespace);
    }

    let resp = builder.send().await.map_err(|e| {
        StorageError::ConnectionFailed(format!("Vault kubernetes login failed: {e}"))
    })?;
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let errors = parse_vault_errors(resp).await;
        return Err(StorageError::AuthenticationFailed(format!(
            "kubernetes login as role {role} rejected ({status}): {}",
            errors.join(", ")
        )));
    }

    let json: Value = resp.json().await.map_err(|e| {
        StorageError::MalformedResponse(format!("Vault login response is not JSON: {e}"))
    })?;
    json.pointer("/auth/client_token")
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| {
            StorageError::AuthenticationFailed(
                "missing client_token in kubernetes login response".to_string(),
            )
        })
}
