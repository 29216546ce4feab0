use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    ListingFilter, Store, StoreError, StoreResult, SubmissionFilter, TransactionFilter,
};
use crate::models::{MarketplaceListing, Submission, Transaction, User, UserRole};

const USER_COLUMNS: &str = "id, name, wallet_address, email, password_hash, role, \
    total_credits, created_at, updated_at";

const SUBMISSION_COLUMNS: &str = "id, producer_id, production_date, quantity, location, \
    status, credits, credit_id, listed_credits, ipfs_hash, transaction_hash, \
    rejection_reason, reviewed_by, reviewed_at, created_at, updated_at";

const LISTING_COLUMNS: &str = "id, credit_id, producer_id, credits, price_per_credit, \
    total_price, status, buyer_id, transaction_hash, created_at, sold_at";

const TRANSACTION_COLUMNS: &str = "id, tx_type, from_address, to_address, credits, price, \
    transaction_hash, credit_id, listing_id, created_at";

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

fn insert_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::Duplicate(db_err.message().to_string());
        }
    }
    StoreError::Database(err)
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        if !database_url.contains("sslmode=") {
            warn!("Database connection does not set sslmode; consider sslmode=require");
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(3))
            .idle_timeout(Duration::from_secs(180))
            .max_lifetime(Duration::from_secs(900))
            .test_before_acquire(true)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("SET timezone = 'UTC'").execute(&mut *conn).await?;
                    sqlx::query("SET statement_timeout = '15s'")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;

        let started = std::time::Instant::now();
        sqlx::query("SELECT 1").execute(&pool).await?;
        info!(
            "Database connection established in {:?} (max {} connections)",
            started.elapsed(),
            max_connections
        );

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, name, wallet_address, email, password_hash, role, \
             total_credits, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.wallet_address)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.total_credits)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_wallet(&self, wallet_address: &str) -> StoreResult<Option<User>> {
        let query = format!(
            "SELECT {} FROM users WHERE LOWER(wallet_address) = LOWER($1)",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(wallet_address)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let query = format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_users(&self, role: Option<UserRole>) -> StoreResult<Vec<User>> {
        let query = format!(
            "SELECT {} FROM users WHERE ($1::varchar IS NULL OR role = $1) \
             ORDER BY created_at, id",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(role.map(|r| r.as_str()))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn adjust_user_credits(&self, id: Uuid, delta: Decimal) -> StoreResult<User> {
        let query = format!(
            "UPDATE users SET total_credits = total_credits + $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(delta)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))
    }

    async fn insert_submission(&self, submission: &Submission) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO submissions (id, producer_id, production_date, quantity, location, \
             status, credits, credit_id, listed_credits, ipfs_hash, transaction_hash, \
             rejection_reason, reviewed_by, reviewed_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
        )
        .bind(submission.id)
        .bind(submission.producer_id)
        .bind(submission.production_data.date)
        .bind(submission.production_data.quantity)
        .bind(&submission.production_data.location)
        .bind(submission.status)
        .bind(submission.credits)
        .bind(&submission.credit_id)
        .bind(submission.listed_credits)
        .bind(&submission.ipfs_hash)
        .bind(&submission.transaction_hash)
        .bind(&submission.rejection_reason)
        .bind(submission.reviewed_by)
        .bind(submission.reviewed_at)
        .bind(submission.created_at)
        .bind(submission.updated_at)
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;
        Ok(())
    }

    async fn get_submission(&self, id: Uuid) -> StoreResult<Option<Submission>> {
        let query = format!("SELECT {} FROM submissions WHERE id = $1", SUBMISSION_COLUMNS);
        Ok(sqlx::query_as::<_, Submission>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_submission_by_credit_id(
        &self,
        credit_id: &str,
    ) -> StoreResult<Option<Submission>> {
        let query = format!(
            "SELECT {} FROM submissions WHERE credit_id = $1",
            SUBMISSION_COLUMNS
        );
        Ok(sqlx::query_as::<_, Submission>(&query)
            .bind(credit_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_submissions(&self, filter: &SubmissionFilter) -> StoreResult<Vec<Submission>> {
        let query = format!(
            "SELECT {} FROM submissions \
             WHERE ($1::uuid IS NULL OR producer_id = $1) \
               AND ($2::varchar IS NULL OR status = $2) \
             ORDER BY created_at DESC, id DESC",
            SUBMISSION_COLUMNS
        );
        Ok(sqlx::query_as::<_, Submission>(&query)
            .bind(filter.producer_id)
            .bind(filter.status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_submission(&self, submission: &Submission) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE submissions SET status = $2, credits = $3, credit_id = $4, \
             listed_credits = $5, ipfs_hash = $6, transaction_hash = $7, \
             rejection_reason = $8, reviewed_by = $9, reviewed_at = $10, updated_at = $11 \
             WHERE id = $1",
        )
        .bind(submission.id)
        .bind(submission.status)
        .bind(submission.credits)
        .bind(&submission.credit_id)
        .bind(submission.listed_credits)
        .bind(&submission.ipfs_hash)
        .bind(&submission.transaction_hash)
        .bind(&submission.rejection_reason)
        .bind(submission.reviewed_by)
        .bind(submission.reviewed_at)
        .bind(submission.updated_at)
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("submission {}", submission.id)));
        }
        Ok(())
    }

    async fn insert_listing(&self, listing: &MarketplaceListing) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO marketplace_listings (id, credit_id, producer_id, credits, \
             price_per_credit, total_price, status, buyer_id, transaction_hash, created_at, \
             sold_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(listing.id)
        .bind(&listing.credit_id)
        .bind(listing.producer_id)
        .bind(listing.credits)
        .bind(listing.price_per_credit)
        .bind(listing.total_price)
        .bind(listing.status)
        .bind(listing.buyer_id)
        .bind(&listing.transaction_hash)
        .bind(listing.created_at)
        .bind(listing.sold_at)
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;
        Ok(())
    }

    async fn get_listing(&self, id: Uuid) -> StoreResult<Option<MarketplaceListing>> {
        let query = format!(
            "SELECT {} FROM marketplace_listings WHERE id = $1",
            LISTING_COLUMNS
        );
        Ok(sqlx::query_as::<_, MarketplaceListing>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_listings(&self, filter: &ListingFilter) -> StoreResult<Vec<MarketplaceListing>> {
        let query = format!(
            "SELECT {} FROM marketplace_listings \
             WHERE ($1::uuid IS NULL OR producer_id = $1) \
               AND ($2::varchar IS NULL OR status = $2) \
               AND ($3::uuid IS NULL OR buyer_id = $3) \
             ORDER BY created_at DESC, id DESC",
            LISTING_COLUMNS
        );
        Ok(sqlx::query_as::<_, MarketplaceListing>(&query)
            .bind(filter.producer_id)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.buyer_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_listing(&self, listing: &MarketplaceListing) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE marketplace_listings SET status = $2, buyer_id = $3, \
             transaction_hash = $4, sold_at = $5 WHERE id = $1",
        )
        .bind(listing.id)
        .bind(listing.status)
        .bind(listing.buyer_id)
        .bind(&listing.transaction_hash)
        .bind(listing.sold_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("listing {}", listing.id)));
        }
        Ok(())
    }

    async fn insert_transaction(&self, tx: &Transaction) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO transactions (id, tx_type, from_address, to_address, credits, price, \
             transaction_hash, credit_id, listing_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(tx.id)
        .bind(tx.tx_type)
        .bind(&tx.from_address)
        .bind(&tx.to_address)
        .bind(tx.credits)
        .bind(tx.price)
        .bind(&tx.transaction_hash)
        .bind(&tx.credit_id)
        .bind(tx.listing_id)
        .bind(tx.created_at)
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;
        Ok(())
    }

    async fn list_transactions(&self, filter: &TransactionFilter) -> StoreResult<Vec<Transaction>> {
        let query = format!(
            "SELECT {} FROM transactions \
             WHERE ($1::varchar IS NULL \
                    OR LOWER(from_address) = LOWER($1) OR LOWER(to_address) = LOWER($1)) \
               AND ($2::varchar IS NULL OR credit_id = $2) \
             ORDER BY created_at DESC, id DESC",
            TRANSACTION_COLUMNS
        );
        Ok(sqlx::query_as::<_, Transaction>(&query)
            .bind(filter.address.as_deref())
            .bind(filter.credit_id.as_deref())
            .fetch_all(&self.pool)
            .await?)
    }
}
