use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub base_url: String,
    #[serde(default)]
    pub endpoint_name: String,
    /// Deadline for single-response and listing calls. Streamed bodies
    /// are not bounded by it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Where the gateway reads its shared API key from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretStoreKind {
    #[default]
    Env,
    File,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_secret_id")]
    pub secret_id: String,
    /// JSON field holding the key when the stored secret is a JSON object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_field: Option<String>,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default)]
    pub store: SecretStoreKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secrets_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_url: Option<String>,
}

fn default_port() -> u16 {
    8080
}

fn default_backend_url() -> String {
    "http://127.0.0.1:8081".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_secret_id() -> String {
    "chat-gateway".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    300
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            endpoint_name: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_id: default_secret_id(),
            secret_field: None,
            cache_ttl_secs: default_cache_ttl_secs(),
            store: SecretStoreKind::default(),
            secrets_dir: None,
            store_url: None,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            backend: BackendConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Search standard locations for a config file, then apply environment overrides.
    /// Priority: CLI arg > CWD > XDG config > home dir > built-in defaults
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match explicit_path {
            Some(path) => Self::load(path)?,
            None => match config_search_paths().into_iter().find(|p| p.exists()) {
                Some(candidate) => {
                    tracing::info!(path = %candidate.display(), "Loading config");
                    Self::load(&candidate)?
                }
                None => {
                    tracing::info!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay values from the environment. `lookup` is injectable so tests
    /// don't have to mutate the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("GATEWAY_PORT") {
            self.port = port
                .parse()
                .map_err(|_| GatewayError::config(format!("Invalid GATEWAY_PORT '{}'", port)))?;
        }
        if let Some(url) = lookup("GATEWAY_BACKEND_URL") {
            self.backend.base_url = url;
        }
        if let Some(name) = lookup("GATEWAY_ENDPOINT_NAME") {
            self.backend.endpoint_name = name;
        }
        if let Some(id) = lookup("AUTH_SECRET_ID") {
            self.auth.secret_id = id;
        }
        if let Some(ttl) = lookup("AUTH_CACHE_TTL_SECS") {
            self.auth.cache_ttl_secs = ttl.parse().map_err(|_| {
                GatewayError::config(format!("Invalid AUTH_CACHE_TTL_SECS '{}'", ttl))
            })?;
        }
        Ok(())
    }

    /// Reject configurations the gateway cannot serve requests with.
    pub fn validate(&self) -> Result<()> {
        if self.backend.endpoint_name.trim().is_empty() {
            return Err(GatewayError::config(
                "No backend endpoint configured. Set backend.endpoint_name or GATEWAY_ENDPOINT_NAME",
            ));
        }
        if self.auth.cache_ttl_secs == 0 {
            return Err(GatewayError::config("auth.cache_ttl_secs must be positive"));
        }
        match self.auth.store {
            SecretStoreKind::File if self.auth.secrets_dir.is_none() => Err(
                GatewayError::config("auth.store = \"file\" requires auth.secrets_dir"),
            ),
            SecretStoreKind::Http if self.auth.store_url.is_none() => Err(
                GatewayError::config("auth.store = \"http\" requires auth.store_url"),
            ),
            _ => Ok(()),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.auth.cache_ttl_secs)
    }
}

pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("chat-gateway.toml")];

    if cfg!(target_os = "macos") {
        if let Some(home) = home_dir() {
            paths.push(
                home.join("Library")
                    .join("Application Support")
                    .join("chat-gateway")
                    .join("config.toml"),
            );
        }
    } else {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg).join("chat-gateway").join("config.toml"));
        }
        if let Some(home) = home_dir() {
            paths.push(home.join(".config").join("chat-gateway").join("config.toml"));
        }
    }

    if let Some(home) = home_dir() {
        paths.push(home.join(".chat-gateway.toml"));
    }

    paths
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}
