//! Application startup and initialization logic.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::sync::Mutex;
use tracing::info;

use crate::app_state::AppState;
use crate::auth::JwtService;
use crate::config::Config;
use crate::database::{self, SharedStore};
use crate::services::{
    BlockchainService, CreditService, HealthChecker, IpfsService, MarketplaceService,
    SubmissionService, UserService,
};

/// Install the Prometheus recorder, open the store, build the adapters and
/// assemble the [`AppState`].
pub async fn initialize_app(config: Config) -> Result<AppState> {
    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;
    info!("Prometheus metrics initialized");

    let store = database::setup_store(&config.store).await?;

    let ipfs = IpfsService::new(
        config.pinata.clone(),
        Duration::from_secs(config.request_timeout),
    )?;
    let blockchain = BlockchainService::new(&config.ethereum)?;
    info!(
        ipfs = ipfs.mode(),
        blockchain = blockchain.mode(),
        chain_id = blockchain.chain_id(),
        "External adapters initialized"
    );

    build_state(config, store, ipfs, blockchain, Some(metrics_handle)).await
}

/// Wire the services over an already opened store and seed the regulatory
/// authority account.
pub async fn build_state(
    config: Config,
    store: SharedStore,
    ipfs: IpfsService,
    blockchain: BlockchainService,
    metrics_handle: Option<PrometheusHandle>,
) -> Result<AppState> {
    let jwt_service = JwtService::new(&config.jwt_secret, config.jwt_expiration);

    // One lock for every multi-record state transition.
    let lifecycle = Arc::new(Mutex::new(()));

    let user_service = UserService::new(store.clone());
    let submission_service = SubmissionService::new(store.clone());
    let credit_service = CreditService::new(
        store.clone(),
        ipfs.clone(),
        blockchain.clone(),
        lifecycle.clone(),
    );
    let marketplace_service =
        MarketplaceService::new(store.clone(), ipfs.clone(), blockchain.clone(), lifecycle);
    let health_checker = HealthChecker::new(
        config.environment.clone(),
        store.clone(),
        ipfs.clone(),
        blockchain.clone(),
    );

    user_service
        .seed_regulatory_authority(&config.regulatory)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to seed regulatory authority: {}", e))?;

    Ok(AppState {
        config: Arc::new(config),
        store,
        jwt_service,
        ipfs_service: ipfs,
        blockchain_service: blockchain,
        user_service,
        submission_service,
        credit_service,
        marketplace_service,
        health_checker,
        metrics_handle,
    })
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
