//! Persistence for users, submissions, listings and transactions.
//!
//! Two backends implement [`Store`]:
//! - [`FileStore`]: in-memory maps mirrored to JSON files in a data directory
//! - [`PgStore`]: PostgreSQL via sqlx
//!
//! Records reference each other by id only; nothing here enforces integrity across
//! collections.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::config::{StoreBackend, StoreConfig};
use crate::models::{
    ListingStatus, MarketplaceListing, Submission, SubmissionStatus, Transaction, User, UserRole,
};

pub mod file_store;
pub mod pg_store;

pub use file_store::FileStore;
pub use pg_store::PgStore;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Corrupt data file: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone, Default)]
pub struct SubmissionFilter {
    pub producer_id: Option<Uuid>,
    pub status: Option<SubmissionStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    pub producer_id: Option<Uuid>,
    pub status: Option<ListingStatus>,
    pub buyer_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub address: Option<String>,
    pub credit_id: Option<String>,
}

impl SubmissionFilter {
    pub fn matches(&self, submission: &Submission) -> bool {
        self.producer_id.map_or(true, |id| submission.producer_id == id)
            && self.status.map_or(true, |s| submission.status == s)
    }
}

impl ListingFilter {
    pub fn matches(&self, listing: &MarketplaceListing) -> bool {
        self.producer_id.map_or(true, |id| listing.producer_id == id)
            && self.status.map_or(true, |s| listing.status == s)
            && self.buyer_id.map_or(true, |id| listing.buyer_id == Some(id))
    }
}

impl TransactionFilter {
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.address.as_deref().map_or(true, |a| tx.involves(a))
            && self.credit_id.as_deref().map_or(true, |c| tx.credit_id == c)
    }
}

/// Storage backend shared by all services.
///
/// Listing methods return records oldest first unless stated otherwise.
#[async_trait]
pub trait Store: Send + Sync {
    /// Backend name reported by the health endpoint
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> StoreResult<()>;

    // Users
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_wallet(&self, wallet_address: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn list_users(&self, role: Option<UserRole>) -> StoreResult<Vec<User>>;
    /// Atomically add `delta` (possibly negative) to a user's credit balance.
    async fn adjust_user_credits(&self, id: Uuid, delta: Decimal) -> StoreResult<User>;

    // Submissions
    async fn insert_submission(&self, submission: &Submission) -> StoreResult<()>;
    async fn get_submission(&self, id: Uuid) -> StoreResult<Option<Submission>>;
    async fn find_submission_by_credit_id(&self, credit_id: &str)
        -> StoreResult<Option<Submission>>;
    /// Newest first
    async fn list_submissions(&self, filter: &SubmissionFilter) -> StoreResult<Vec<Submission>>;
    async fn update_submission(&self, submission: &Submission) -> StoreResult<()>;

    // Marketplace listings
    async fn insert_listing(&self, listing: &MarketplaceListing) -> StoreResult<()>;
    async fn get_listing(&self, id: Uuid) -> StoreResult<Option<MarketplaceListing>>;
    /// Newest first
    async fn list_listings(&self, filter: &ListingFilter) -> StoreResult<Vec<MarketplaceListing>>;
    async fn update_listing(&self, listing: &MarketplaceListing) -> StoreResult<()>;

    // Transactions
    async fn insert_transaction(&self, tx: &Transaction) -> StoreResult<()>;
    /// Newest first
    async fn list_transactions(&self, filter: &TransactionFilter) -> StoreResult<Vec<Transaction>>;
}

pub type SharedStore = Arc<dyn Store>;

/// Open the configured storage backend.
pub async fn setup_store(config: &StoreConfig) -> anyhow::Result<SharedStore> {
    match config.backend {
        StoreBackend::File => {
            let store = FileStore::open(&config.data_dir).await?;
            info!("File store opened at {}", config.data_dir.display());
            Ok(Arc::new(store))
        }
        StoreBackend::Postgres => {
            let database_url = config.database_url.as_deref().ok_or_else(|| {
                anyhow::anyhow!("DATABASE_URL environment variable is required for postgres")
            })?;
            let store = PgStore::connect(database_url, config.max_connections).await?;
            store.run_migrations().await?;
            info!("PostgreSQL store ready");
            Ok(Arc::new(store))
        }
    }
}
