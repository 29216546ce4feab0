use std::net::SocketAddr;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use h2_credit_api::config::{Config, LogFormat, StoreBackend};
use h2_credit_api::{build_router, startup};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "h2_credit_api=debug,tower_http=debug".into());

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file first
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(config.log_format);
    info!(
        environment = %config.environment,
        store = ?config.store.backend,
        "Loaded configuration"
    );
    if config.is_production() && config.store.backend == StoreBackend::File {
        warn!("Running production on the JSON file store; set STORE_BACKEND=postgres");
    }

    let port = config.port;
    let app_state = startup::initialize_app(config).await?;
    let app = build_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting hydrogen credit API on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(startup::shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
