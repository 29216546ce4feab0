//! Application state shared across all handlers.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::auth::JwtService;
use crate::config::Config;
use crate::database::SharedStore;
use crate::services::{
    BlockchainService, CreditService, HealthChecker, IpfsService, MarketplaceService,
    SubmissionService, UserService,
};

/// Application state shared across handlers.
///
/// Every service is a cheap `Clone` handle; cloning the state per request
/// clones only `Arc`s.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Record store (JSON files or PostgreSQL)
    pub store: SharedStore,
    /// Regulatory authority token issuing and checking
    pub jwt_service: JwtService,
    /// Pinata adapter, possibly disabled
    pub ipfs_service: IpfsService,
    /// Credit ledger contract adapter, possibly in stub mode
    pub blockchain_service: BlockchainService,
    pub user_service: UserService,
    pub submission_service: SubmissionService,
    /// Approval, rejection and credit views
    pub credit_service: CreditService,
    pub marketplace_service: MarketplaceService,
    pub health_checker: HealthChecker,
    /// Prometheus renderer; `None` when no recorder was installed
    pub metrics_handle: Option<PrometheusHandle>,
}
