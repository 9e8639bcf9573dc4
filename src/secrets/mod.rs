//! Consumption side of the secret store: where the gateway's shared API key
//! comes from, and how it is cached between requests.

pub mod cache;
pub mod store;

pub use cache::CredentialCache;
pub use store::{EnvSecretStore, FileSecretStore, HttpSecretStore};

use crate::config::{AuthConfig, SecretStoreKind};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Read-only access to an external secret store.
///
/// Implementations must not log secret values.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the raw secret string stored under `secret_id`.
    async fn fetch(&self, secret_id: &str) -> Result<String>;
}

/// Build the store selected by the `[auth]` config section.
pub fn store_from_config(
    auth: &AuthConfig,
    client: &reqwest::Client,
) -> Result<Arc<dyn SecretStore>> {
    let store: Arc<dyn SecretStore> = match auth.store {
        SecretStoreKind::Env => Arc::new(EnvSecretStore::new()),
        SecretStoreKind::File => {
            let dir = auth
                .secrets_dir
                .clone()
                .ok_or_else(|| GatewayError::config("auth.secrets_dir is not set"))?;
            Arc::new(FileSecretStore::new(dir))
        }
        SecretStoreKind::Http => {
            let url = auth
                .store_url
                .clone()
                .ok_or_else(|| GatewayError::config("auth.store_url is not set"))?;
            Arc::new(HttpSecretStore::new(client.clone(), url))
        }
    };
    Ok(store)
}
