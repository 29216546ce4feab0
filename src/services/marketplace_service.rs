//! Listing, purchase and cancellation of issued credits.
//!
//! Store mutations run under the lifecycle lock shared with [`CreditService`];
//! contract calls and IPFS pins run afterwards and never fail the request.
//!
//! [`CreditService`]: super::CreditService

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use super::blockchain_service::{BlockchainService, ChainError};
use super::credit_service::{issuer_name, pin_metadata};
use super::ipfs_service::IpfsService;
use crate::constants::metric_names;
use crate::database::{ListingFilter, SharedStore, TransactionFilter};
use crate::error::{ApiError, ErrorCode, Result};
use crate::models::{
    CreditMetadata, CreditOwner, ListingStatus, MarketplaceListing, SubmissionStatus,
    Transaction, TransactionType, TransferRecord, User, UserRole,
};

fn chain_hash(result: std::result::Result<String, ChainError>, call: &str) -> Option<String> {
    match result {
        Ok(hash) => Some(hash),
        Err(e) => {
            counter!(metric_names::EXTERNAL_FAILURES_TOTAL, "service" => "blockchain").increment(1);
            warn!(error = %e, "{} failed", call);
            None
        }
    }
}

#[derive(Clone)]
pub struct MarketplaceService {
    store: SharedStore,
    ipfs: IpfsService,
    blockchain: BlockchainService,
    lifecycle: Arc<Mutex<()>>,
}

impl MarketplaceService {
    pub fn new(
        store: SharedStore,
        ipfs: IpfsService,
        blockchain: BlockchainService,
        lifecycle: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            store,
            ipfs,
            blockchain,
            lifecycle,
        }
    }

    async fn user(&self, id: Uuid, label: &str) -> Result<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| ApiError::not_found(label))
    }

    async fn active_listing(&self, id: Uuid) -> Result<MarketplaceListing> {
        let listing = self.get_listing(id).await?;
        if !listing.is_active() {
            return Err(ApiError::with_code(
                ErrorCode::ListingNotActive,
                format!("Listing is {}", listing.status),
            ));
        }
        Ok(listing)
    }

    /// Put part of an approved credit up for sale.
    pub async fn create_listing(
        &self,
        producer_id: Uuid,
        credit_id: &str,
        credits: Decimal,
        price_per_credit: Decimal,
    ) -> Result<MarketplaceListing> {
        if credits <= Decimal::ZERO {
            return Err(ApiError::with_code(
                ErrorCode::InvalidAmount,
                "Credits must be greater than zero",
            ));
        }
        if price_per_credit <= Decimal::ZERO {
            return Err(ApiError::with_code(
                ErrorCode::InvalidAmount,
                "Price per credit must be greater than zero",
            ));
        }
        let listing = MarketplaceListing::new(credit_id, producer_id, credits, price_per_credit)
            .ok_or_else(|| {
                ApiError::with_code(ErrorCode::InvalidAmount, "Total listing price is too large")
            })?;

        let (mut listing, producer) = {
            let _guard = self.lifecycle.lock().await;

            let producer = self.user(producer_id, "Producer").await?;
            if producer.role != UserRole::Producer {
                return Err(ApiError::role_not_authorized("Only producers can list credits"));
            }

            let mut submission = self
                .store
                .find_submission_by_credit_id(credit_id)
                .await?
                .filter(|s| s.status == SubmissionStatus::Approved)
                .ok_or_else(|| ApiError::not_found("Credit"))?;
            if submission.producer_id != producer.id {
                return Err(ApiError::with_code(
                    ErrorCode::ResourceAccessDenied,
                    "Credit belongs to another producer",
                ));
            }

            let available = submission.available_credits();
            if credits > available {
                return Err(ApiError::insufficient_credits(available));
            }

            submission.listed_credits += credits;
            submission.updated_at = Utc::now();
            self.store.update_submission(&submission).await?;
            self.store.insert_listing(&listing).await?;
            (listing, producer)
        };

        counter!(metric_names::LISTINGS_TOTAL).increment(1);
        info!(
            listing_id = %listing.id,
            credit_id,
            credits = %credits,
            price_per_credit = %price_per_credit,
            "Listing created"
        );

        let hash = chain_hash(
            self.blockchain
                .list_credits_for_sale(credits, price_per_credit)
                .await,
            "listCreditsForSale",
        );

        if let Some(hash) = &hash {
            let _guard = self.lifecycle.lock().await;
            if let Some(mut latest) = self.store.get_listing(listing.id).await? {
                if latest.transaction_hash.is_none() {
                    latest.transaction_hash = Some(hash.clone());
                    self.store.update_listing(&latest).await?;
                }
                listing = latest;
            }
        }

        let record = Transaction::new(
            TransactionType::Listing,
            producer.address_or_zero(),
            self.blockchain.contract_address(),
            credits,
            listing.total_price,
            credit_id,
        )
        .with_hash(hash)
        .with_listing(listing.id);
        self.store.insert_transaction(&record).await?;

        Ok(listing)
    }

    /// Newest first
    pub async fn list_listings(&self, filter: &ListingFilter) -> Result<Vec<MarketplaceListing>> {
        Ok(self.store.list_listings(filter).await?)
    }

    pub async fn get_listing(&self, id: Uuid) -> Result<MarketplaceListing> {
        self.store
            .get_listing(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Listing"))
    }

    /// Buy a whole listing.
    pub async fn purchase(&self, listing_id: Uuid, buyer_id: Uuid) -> Result<MarketplaceListing> {
        let (mut listing, producer, buyer) = {
            let _guard = self.lifecycle.lock().await;

            let mut listing = self.active_listing(listing_id).await?;
            let buyer = self.user(buyer_id, "Buyer").await?;
            if buyer.role != UserRole::Buyer {
                return Err(ApiError::role_not_authorized("Only buyers can purchase credits"));
            }
            if buyer.id == listing.producer_id {
                return Err(ApiError::with_code(
                    ErrorCode::SelfPurchase,
                    "Producers cannot purchase their own listings",
                ));
            }
            self.user(listing.producer_id, "Producer").await?;

            let now = Utc::now();
            listing.status = ListingStatus::Sold;
            listing.buyer_id = Some(buyer.id);
            listing.sold_at = Some(now);
            self.store.update_listing(&listing).await?;

            let producer = self
                .store
                .adjust_user_credits(listing.producer_id, -listing.credits)
                .await?;
            let buyer = self
                .store
                .adjust_user_credits(buyer.id, listing.credits)
                .await?;
            (listing, producer, buyer)
        };

        counter!(metric_names::PURCHASES_TOTAL).increment(1);
        info!(
            listing_id = %listing.id,
            buyer_id = %buyer.id,
            credits = %listing.credits,
            total_price = %listing.total_price,
            "Listing purchased"
        );

        let purchase_hash = chain_hash(
            self.blockchain
                .purchase_credits(listing.id, listing.credits, listing.total_price)
                .await,
            "purchaseCredits",
        );
        let transfer_hash = match (
            producer.wallet_address.as_deref(),
            buyer.wallet_address.as_deref(),
        ) {
            (Some(from), Some(to)) => chain_hash(
                self.blockchain
                    .transfer_credits(from, to, listing.credits)
                    .await,
                "transferCredits",
            ),
            _ => None,
        };
        let hash = transfer_hash.or(purchase_hash);

        self.pin_transfer(&listing, &producer, &buyer).await;

        if let Some(hash) = &hash {
            let _guard = self.lifecycle.lock().await;
            if let Some(mut latest) = self.store.get_listing(listing.id).await? {
                latest.transaction_hash = Some(hash.clone());
                self.store.update_listing(&latest).await?;
                listing = latest;
            }
        }

        let record = Transaction::new(
            TransactionType::Purchase,
            producer.address_or_zero(),
            buyer.address_or_zero(),
            listing.credits,
            listing.total_price,
            listing.credit_id.clone(),
        )
        .with_hash(hash)
        .with_listing(listing.id);
        self.store.insert_transaction(&record).await?;

        Ok(listing)
    }

    async fn pin_transfer(&self, listing: &MarketplaceListing, producer: &User, buyer: &User) {
        let submission = match self.store.find_submission_by_credit_id(&listing.credit_id).await {
            Ok(Some(submission)) => submission,
            Ok(None) => return,
            Err(e) => {
                warn!(credit_id = %listing.credit_id, error = %e, "Could not load credit for transfer record");
                return;
            }
        };
        let issuer = issuer_name(&self.store, &submission).await;
        let Some(metadata) = CreditMetadata::issuance(&submission, producer, &issuer) else {
            return;
        };

        let transfer = TransferRecord {
            from: CreditOwner::from(producer),
            to: CreditOwner::from(buyer),
            credits: listing.credits,
            price: listing.total_price,
            listing_id: listing.id,
            at: listing.sold_at.unwrap_or_else(Utc::now),
        };
        pin_metadata(&self.ipfs, "transfer", &metadata.transferred(transfer)).await;
    }

    /// Withdraw an active listing and release its credits.
    pub async fn cancel(&self, listing_id: Uuid, producer_id: Uuid) -> Result<MarketplaceListing> {
        let (listing, producer) = {
            let _guard = self.lifecycle.lock().await;

            let mut listing = self.get_listing(listing_id).await?;
            if listing.producer_id != producer_id {
                return Err(ApiError::with_code(
                    ErrorCode::ResourceAccessDenied,
                    "Only the listing's producer can cancel it",
                ));
            }
            if !listing.is_active() {
                return Err(ApiError::with_code(
                    ErrorCode::ListingNotActive,
                    format!("Listing is {}", listing.status),
                ));
            }
            let producer = self.user(producer_id, "Producer").await?;

            listing.status = ListingStatus::Cancelled;
            self.store.update_listing(&listing).await?;

            if let Some(mut submission) = self
                .store
                .find_submission_by_credit_id(&listing.credit_id)
                .await?
            {
                submission.listed_credits =
                    (submission.listed_credits - listing.credits).max(Decimal::ZERO);
                submission.updated_at = Utc::now();
                self.store.update_submission(&submission).await?;
            }
            (listing, producer)
        };

        info!(listing_id = %listing.id, credits = %listing.credits, "Listing cancelled");

        let record = Transaction::new(
            TransactionType::Delisting,
            self.blockchain.contract_address(),
            producer.address_or_zero(),
            listing.credits,
            Decimal::ZERO,
            listing.credit_id.clone(),
        )
        .with_listing(listing.id);
        self.store.insert_transaction(&record).await?;

        Ok(listing)
    }

    /// Newest first
    pub async fn transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        Ok(self.store.list_transactions(filter).await?)
    }
}
