use crate::auth::require_bearer;
use crate::backend::EndpointClient;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::logging::SharedLogger;
use crate::proxy;
use crate::secrets::{store_from_config, CredentialCache};
use crate::translate::openai_types::ErrorResponse;
use crate::translate::request::parse_request;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures::stream::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: GatewayConfig,
    pub endpoint: EndpointClient,
    pub credentials: Arc<CredentialCache>,
    pub logger: SharedLogger,
}

impl AppState {
    /// Wire up the endpoint client and credential cache described by `config`.
    pub fn from_config(
        config: GatewayConfig,
        client: reqwest::Client,
        logger: SharedLogger,
    ) -> crate::Result<Self> {
        let store = store_from_config(&config.auth, &client)?;
        let mut cache = CredentialCache::new(store, config.auth.secret_id.clone(), config.cache_ttl());
        if let Some(ref field) = config.auth.secret_field {
            cache = cache.with_field(field.clone());
        }

        Ok(Self {
            endpoint: EndpointClient::new(client, &config.backend),
            credentials: Arc::new(cache),
            config,
            logger,
        })
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected = Router::new()
        .route("/v1/chat/completions", post(handle_chat_completions))
        .route("/health", get(handle_health))
        .route("/v1/models", get(handle_models))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .merge(protected)
        .route("/ping", get(handle_ping))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn error_response(err: &GatewayError) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = match status {
        StatusCode::INTERNAL_SERVER_ERROR => "Internal gateway error".to_string(),
        _ => err.to_string(),
    };
    (status, Json(ErrorResponse::new(err.error_type(), message))).into_response()
}

async fn handle_chat_completions(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let logger = state.logger.request(uuid::Uuid::new_v4().to_string());

    let req = match parse_request(&body) {
        Ok(r) => r,
        Err(e) => {
            logger.warn("server", format!("Rejected request: {}", e));
            return error_response(&e);
        }
    };

    logger.info(
        "server",
        format!("Request: streaming={} messages={}", req.stream, req.messages.len()),
    );

    if !req.stream {
        return match proxy::proxy_non_streaming(&req, &state.endpoint, &logger).await {
            Ok(resp) => Json(resp).into_response(),
            Err(e) => {
                logger.error("server", format!("Proxy error: {}", e));
                error_response(&e)
            }
        };
    }

    let events = match proxy::proxy_streaming(&req, &state.endpoint, &logger).await {
        Ok(s) => s,
        Err(e) => {
            logger.error("server", format!("Streaming setup error: {}", e));
            return error_response(&e);
        }
    };

    let sse = events.map(|event| -> std::result::Result<Event, Infallible> {
        Ok(Event::default().data(event.data()))
    });

    Sse::new(sse).into_response()
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn handle_ping() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn handle_models(State(state): State<Arc<AppState>>) -> Response {
    match state.endpoint.list_endpoints().await {
        Ok(endpoints) => Json(endpoints).into_response(),
        Err(e) => {
            state.logger.error("server", format!("Failed to list endpoints: {}", e));
            error_response(&e)
        }
    }
}
