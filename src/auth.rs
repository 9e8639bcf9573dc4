//! Bearer-key check for protected routes.

use crate::error::GatewayError;
use crate::server::AppState;
use crate::translate::openai_types::ErrorResponse;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;

/// Extract the key from an `Authorization: Bearer <key>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, GatewayError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| GatewayError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| GatewayError::unauthorized("Invalid Authorization header"))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| GatewayError::unauthorized("Authorization header must be 'Bearer <key>'"))
}

/// Compare the presented key against the cached one. Absence of a cached key
/// (store down and never fetched) rejects every request.
pub async fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), GatewayError> {
    let presented = bearer_token(headers)?;
    match state.credentials.get().await {
        Some(expected) if expected == presented => Ok(()),
        Some(_) => Err(GatewayError::unauthorized("Invalid API key")),
        None => Err(GatewayError::unauthorized("API key could not be verified")),
    }
}

/// Middleware guarding every route it is layered on.
pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    match authorize(&state, request.headers()).await {
        Ok(()) => next.run(request).await,
        Err(err) => {
            state.logger.warn(
                "auth",
                format!("Rejected {} {}: {}", request.method(), request.uri().path(), err),
            );
            let body = ErrorResponse::unauthorized(err.to_string());
            (StatusCode::UNAUTHORIZED, Json(body)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn test_bearer_token_extracted() {
        assert_eq!(bearer_token(&headers("Bearer abc123")).unwrap(), "abc123");
        assert_eq!(bearer_token(&headers("Bearer  padded ")).unwrap(), "padded");
    }

    #[test]
    fn test_bearer_token_rejections() {
        assert!(bearer_token(&HeaderMap::new()).is_err());
        assert!(bearer_token(&headers("Basic dXNlcjpwYXNz")).is_err());
        assert!(bearer_token(&headers("Bearer ")).is_err());
        assert!(bearer_token(&headers("bearer abc")).is_err());
    }
}
