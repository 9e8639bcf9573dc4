//! Single-secret cache with TTL and stale fallback.
//!
//! A fresh value is served from memory under a shared read lock. Once the TTL
//! has elapsed the next caller refreshes from the store; if that fails the
//! previous value keeps being served until a refresh succeeds. Concurrent
//! refreshes are not coalesced: store reads have no side effects and the last
//! successful write wins.

use super::SecretStore;
use crate::error::{GatewayError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CachedSecret {
    value: String,
    fetched_at: Instant,
}

impl CachedSecret {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

pub struct CredentialCache {
    store: Arc<dyn SecretStore>,
    secret_id: String,
    field: Option<String>,
    ttl: Duration,
    current: RwLock<Option<CachedSecret>>,
}

impl CredentialCache {
    pub fn new(store: Arc<dyn SecretStore>, secret_id: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            secret_id: secret_id.into(),
            field: None,
            ttl,
            current: RwLock::new(None),
        }
    }

    /// Treat the stored secret as a JSON object and use `field` from it.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current secret value, refreshing from the store when the cached one is
    /// missing or expired. Returns `None` only when the store fails and nothing
    /// has ever been fetched.
    pub async fn get(&self) -> Option<String> {
        let previous = {
            let current = self.current.read().await;
            match current.as_ref() {
                Some(cached) if cached.is_fresh(self.ttl) => return Some(cached.value.clone()),
                other => other.map(|c| c.value.clone()),
            }
        };

        match self.refresh().await {
            Ok(value) => Some(value),
            Err(e) => match previous {
                Some(stale) => {
                    tracing::warn!(
                        secret_id = %self.secret_id,
                        error = %e,
                        "Secret refresh failed, serving stale value"
                    );
                    Some(stale)
                }
                None => {
                    tracing::error!(
                        secret_id = %self.secret_id,
                        error = %e,
                        "Secret refresh failed and no cached value exists"
                    );
                    None
                }
            },
        }
    }

    /// Fetch from the store and replace the cached value.
    pub async fn refresh(&self) -> Result<String> {
        let raw = self.store.fetch(&self.secret_id).await?;
        let value = match self.field {
            Some(ref field) => select_field(&raw, field)?,
            None => raw,
        };

        *self.current.write().await = Some(CachedSecret {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        tracing::debug!(secret_id = %self.secret_id, len = value.len(), "Refreshed secret");

        Ok(value)
    }
}

/// Pull a string field out of a secret stored as a JSON object.
fn select_field(raw: &str, field: &str) -> Result<String> {
    let parsed: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| GatewayError::secret(format!("Secret is not a JSON object: {e}")))?;

    let object = parsed
        .as_object()
        .ok_or_else(|| GatewayError::secret("Secret is not a JSON object"))?;

    match object.get(field).and_then(|v| v.as_str()) {
        Some(value) => Ok(value.to_string()),
        None => {
            let keys: Vec<&str> = object.keys().map(String::as_str).collect();
            Err(GatewayError::secret(format!(
                "Field '{field}' missing from secret; available keys: {keys:?}"
            )))
        }
    }
}
