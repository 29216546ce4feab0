// Business logic services
// Users, submissions, credit issuance, marketplace, and the IPFS / contract adapters

pub mod blockchain_service;
pub mod credit_service;
pub mod health_check;
pub mod ipfs_service;
pub mod marketplace_service;
pub mod submission_service;
pub mod user_service;

pub use blockchain_service::{BlockchainService, ChainError};
pub use credit_service::{CreditDetails, CreditService, PinnedMetadata, RegulatoryStats, UserCredits};
pub use health_check::{HealthCheckStatus, HealthChecker, HealthStatus};
pub use ipfs_service::{IpfsError, IpfsService};
pub use marketplace_service::MarketplaceService;
pub use submission_service::SubmissionService;
pub use user_service::UserService;
