//! Secret store backends.

use super::SecretStore;
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const ENV_PREFIX: &str = "GATEWAY_SECRET_";
const HTTP_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Reads secrets from `GATEWAY_SECRET_<ID>` environment variables.
///
/// The id is upper-cased and every non-alphanumeric character becomes `_`,
/// so `chat-gateway` is read from `GATEWAY_SECRET_CHAT_GATEWAY`.
#[derive(Debug, Clone, Default)]
pub struct EnvSecretStore;

impl EnvSecretStore {
    pub fn new() -> Self {
        Self
    }

    pub fn var_name(secret_id: &str) -> String {
        let suffix: String = secret_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{ENV_PREFIX}{suffix}")
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn fetch(&self, secret_id: &str) -> Result<String> {
        let name = Self::var_name(secret_id);
        std::env::var(&name)
            .map_err(|_| GatewayError::secret(format!("Environment variable '{name}' not set")))
    }
}

/// Reads secrets from `<dir>/<secret_id>`, e.g. a mounted secrets volume.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    dir: PathBuf,
}

impl FileSecretStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn fetch(&self, secret_id: &str) -> Result<String> {
        if secret_id.contains(['/', '\\']) || secret_id == ".." {
            return Err(GatewayError::secret(format!(
                "Invalid secret id '{secret_id}'"
            )));
        }
        let path = self.dir.join(secret_id);
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            GatewayError::secret(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Ok(content.trim_end_matches(['\n', '\r']).to_string())
    }
}

#[derive(Debug, Deserialize)]
struct SecretValueResponse {
    #[serde(rename = "SecretString")]
    secret_string: Option<String>,
}

/// Fetches secrets over HTTP: `GET {base_url}/secrets/{id}` returning
/// `{"SecretString": "..."}`.
#[derive(Debug, Clone)]
pub struct HttpSecretStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSecretStore {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl SecretStore for HttpSecretStore {
    async fn fetch(&self, secret_id: &str) -> Result<String> {
        let url = format!("{}/secrets/{}", self.base_url.trim_end_matches('/'), secret_id);

        let response = self
            .client
            .get(&url)
            .timeout(HTTP_FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| GatewayError::secret(format!("Secret store request failed: {e}")))?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(GatewayError::secret(format!(
                "Secret store returned status {status} for '{secret_id}'"
            )));
        }

        let parsed: SecretValueResponse = response.json().await.map_err(|e| {
            GatewayError::secret(format!("Failed to parse secret store response: {e}"))
        })?;

        parsed
            .secret_string
            .ok_or_else(|| GatewayError::secret(format!("Secret '{secret_id}' has no SecretString")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_env_var_name() {
        assert_eq!(
            EnvSecretStore::var_name("chat-gateway"),
            "GATEWAY_SECRET_CHAT_GATEWAY"
        );
        assert_eq!(EnvSecretStore::var_name("a.b/c"), "GATEWAY_SECRET_A_B_C");
    }

    #[tokio::test]
    async fn test_env_store_reads_variable() {
        std::env::set_var("GATEWAY_SECRET_ENV_STORE_TEST", "s3cret");
        let value = EnvSecretStore::new().fetch("env-store-test").await.unwrap();
        assert_eq!(value, "s3cret");

        let missing = EnvSecretStore::new().fetch("env-store-missing").await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn test_file_store_trims_trailing_newline() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("gateway"), "abc123\n").unwrap();

        let store = FileSecretStore::new(dir.path());
        assert_eq!(store.fetch("gateway").await.unwrap(), "abc123");
        assert!(store.fetch("absent").await.is_err());
    }

    #[tokio::test]
    async fn test_file_store_rejects_path_ids() {
        let dir = tempdir().unwrap();
        let store = FileSecretStore::new(dir.path());
        assert!(store.fetch("../etc/passwd").await.is_err());
    }
}
