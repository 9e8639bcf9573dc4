//! Start a chat-gateway server programmatically.
//!
//! Usage:
//!   export GATEWAY_ENDPOINT_NAME=my-endpoint
//!   export GATEWAY_SECRET_CHAT_GATEWAY=my-api-key
//!   cargo run --example basic_gateway

use chat_gateway::backend::http_client;
use chat_gateway::{build_router, AppState, GatewayConfig, SharedLogger};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = GatewayConfig::find_and_load(None)?;
    config.validate()?;

    println!("Backend:  {}", config.backend.base_url);
    println!("Endpoint: {}", config.backend.endpoint_name);

    let client = http_client()?;

    let port = config.port;
    let state = Arc::new(AppState::from_config(config, client, SharedLogger::in_memory())?);

    let app = build_router(state);
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!("Listening on http://{}", addr);
    println!();
    println!("  curl -N http://localhost:{}/v1/chat/completions \\", port);
    println!("    -H 'Authorization: Bearer $KEY' \\");
    println!("    -d '{{\"messages\":[{{\"role\":\"user\",\"content\":\"hi\"}}],\"stream\":true}}'");

    axum::serve(listener, app).await?;
    Ok(())
}
