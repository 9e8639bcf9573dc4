use chat_gateway::backend::http_client;
use chat_gateway::config::config_search_paths;
use chat_gateway::{build_router, AppState, GatewayConfig, SharedLogger};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "chat-gateway",
    about = "OpenAI-compatible chat completions gateway for streaming inference endpoints",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Backend endpoint name (overrides config)
    #[arg(long)]
    endpoint: Option<String>,

    /// Request journal path (JSONL)
    #[arg(long, default_value = "chat-gateway.log")]
    log_file: PathBuf,

    /// Print config search paths and exit
    #[arg(long)]
    show_config_paths: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if cli.show_config_paths {
        println!("Config search paths:");
        for (i, path) in config_search_paths().iter().enumerate() {
            println!("  {}. {}", i + 1, path.display());
        }
        return Ok(());
    }

    let mut config = GatewayConfig::find_and_load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(endpoint) = cli.endpoint {
        config.backend.endpoint_name = endpoint;
    }
    config.validate()?;

    let logger = SharedLogger::new(&cli.log_file)?;

    info!("chat-gateway v{}", env!("CARGO_PKG_VERSION"));
    info!("  Backend:   {}", config.backend.base_url);
    info!("  Endpoint:  {}", config.backend.endpoint_name);
    info!("  Secret:    {} ({:?} store, ttl {}s)", config.auth.secret_id, config.auth.store, config.auth.cache_ttl_secs);
    info!("  Port:      {}", config.port);
    info!("  Log file:  {}", cli.log_file.display());

    logger.info(
        "startup",
        format!(
            "Starting chat-gateway endpoint={} backend={} port={}",
            config.backend.endpoint_name, config.backend.base_url, config.port
        ),
    );

    let client = http_client()?;

    let port = config.port;
    let state = Arc::new(AppState::from_config(config, client, logger)?);

    let app = build_router(state);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
