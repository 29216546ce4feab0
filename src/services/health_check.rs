use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use utoipa::ToSchema;

use super::{BlockchainService, IpfsService};
use crate::database::SharedStore;

/// Health report returned by `/health`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: HealthCheckStatus,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub environment: String,
    pub uptime_seconds: u64,
    pub dependencies: Vec<DependencyHealth>,
}

/// Dependency health information
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DependencyHealth {
    pub name: String,
    pub status: HealthCheckStatus,
    pub mode: String,
    pub response_time_ms: Option<u64>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthCheckStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Health checker service
#[derive(Clone)]
pub struct HealthChecker {
    start_time: Arc<Instant>,
    environment: String,
    store: SharedStore,
    ipfs: IpfsService,
    blockchain: BlockchainService,
}

impl HealthChecker {
    pub fn new(
        environment: String,
        store: SharedStore,
        ipfs: IpfsService,
        blockchain: BlockchainService,
    ) -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            environment,
            store,
            ipfs,
            blockchain,
        }
    }

    /// Get uptime in seconds
    pub fn get_uptime(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    async fn check_store(&self) -> DependencyHealth {
        let start = Instant::now();
        let result = self.store.ping().await;
        DependencyHealth {
            name: "store".to_string(),
            status: if result.is_ok() {
                HealthCheckStatus::Healthy
            } else {
                HealthCheckStatus::Unhealthy
            },
            mode: self.store.backend().to_string(),
            response_time_ms: Some(start.elapsed().as_millis() as u64),
            error_message: result.err().map(|e| e.to_string()),
        }
    }

    // Optional adapters report degraded rather than unhealthy when switched off.
    fn adapter(name: &str, mode: &str, enabled: bool) -> DependencyHealth {
        DependencyHealth {
            name: name.to_string(),
            status: if enabled {
                HealthCheckStatus::Healthy
            } else {
                HealthCheckStatus::Degraded
            },
            mode: mode.to_string(),
            response_time_ms: None,
            error_message: None,
        }
    }

    pub async fn check(&self) -> HealthStatus {
        let dependencies = vec![
            self.check_store().await,
            Self::adapter("ipfs", self.ipfs.mode(), self.ipfs.is_enabled()),
            Self::adapter(
                "blockchain",
                self.blockchain.mode(),
                !self.blockchain.is_stub(),
            ),
        ];

        // Only the store decides overall health.
        let status = match dependencies[0].status {
            HealthCheckStatus::Unhealthy => HealthCheckStatus::Unhealthy,
            _ => HealthCheckStatus::Healthy,
        };

        HealthStatus {
            status,
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: self.environment.clone(),
            uptime_seconds: self.get_uptime(),
            dependencies,
        }
    }
}
