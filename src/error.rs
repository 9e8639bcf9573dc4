//! Error types for the gateway.

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GatewayError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Backend error: {message}")]
    Backend { message: String },

    #[error("Secret store error: {message}")]
    Secret { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl GatewayError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: msg.into(),
        }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: msg.into(),
        }
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend {
            message: msg.into(),
        }
    }

    pub fn secret(msg: impl Into<String>) -> Self {
        Self::Secret {
            message: msg.into(),
        }
    }

    /// HTTP status this error surfaces as when it reaches a handler.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest { .. } | Self::Json(_) => 400,
            Self::Unauthorized { .. } => 401,
            Self::Backend { .. } | Self::Http(_) => 502,
            _ => 500,
        }
    }

    /// OpenAI-style error `type` string for the response envelope.
    pub fn error_type(&self) -> &'static str {
        match self.status_code() {
            400 => "invalid_request_error",
            401 => "authentication_error",
            502 => "api_error",
            _ => "server_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
