//! Credit issuance and the read side of issued credits.
//!
//! Approval and rejection change store records while holding the shared lifecycle
//! lock. The IPFS pin and the `generateCredits` call happen after the lock is
//! released; their failures are logged and leave the corresponding hash empty.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::blockchain_service::BlockchainService;
use super::ipfs_service::{IpfsError, IpfsService};
use crate::constants::metric_names;
use crate::database::{ListingFilter, SharedStore, SubmissionFilter};
use crate::error::{ApiError, Result};
use crate::models::{
    credit::{credits_for_quantity, generate_credit_id},
    Credit, CreditMetadata, ListingStatus, MarketplaceListing, Submission, SubmissionStatus,
    Transaction, TransactionType, User,
};

pub(crate) const DEFAULT_ISSUER: &str = "Regulatory Authority";

/// Dashboard counters for the regulatory authority
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegulatoryStats {
    pub total_submissions: usize,
    pub pending_submissions: usize,
    pub approved_submissions: usize,
    pub rejected_submissions: usize,
    #[schema(value_type = f64)]
    pub total_credits_issued: Decimal,
    pub active_listings: usize,
    #[schema(value_type = f64)]
    pub credits_sold: Decimal,
}

/// Credit view together with its pinned metadata, if retrievable
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreditDetails {
    #[serde(flatten)]
    pub credit: Credit,
    #[schema(value_type = Object)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserCredits {
    pub user_id: Uuid,
    #[schema(value_type = f64)]
    pub total_credits: Decimal,
    pub issued: Vec<Credit>,
    pub purchased: Vec<MarketplaceListing>,
}

/// Latest metadata document pinned for a credit
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PinnedMetadata {
    pub credit_id: String,
    pub ipfs_hash: String,
    pub pinned_at: DateTime<Utc>,
    #[schema(value_type = Object)]
    pub content: serde_json::Value,
}

/// Pin a metadata document, logging instead of failing.
pub(crate) async fn pin_metadata(
    ipfs: &IpfsService,
    kind: &str,
    metadata: &CreditMetadata,
) -> Option<String> {
    let keyvalues = HashMap::from([
        ("creditId".to_string(), metadata.credit_id.clone()),
        ("type".to_string(), kind.to_string()),
    ]);
    let name = format!("{}-{}", metadata.credit_id, kind);

    match ipfs.pin_json(&name, keyvalues, metadata).await {
        Ok(pin) => Some(pin.ipfs_hash),
        Err(IpfsError::Disabled) => {
            debug!(credit_id = %metadata.credit_id, "IPFS disabled, metadata not pinned");
            None
        }
        Err(e) => {
            counter!(metric_names::EXTERNAL_FAILURES_TOTAL, "service" => "ipfs").increment(1);
            warn!(credit_id = %metadata.credit_id, error = %e, "Failed to pin credit metadata");
            None
        }
    }
}

/// Name recorded as issuer in credit metadata.
pub(crate) async fn issuer_name(store: &SharedStore, submission: &Submission) -> String {
    match submission.reviewed_by {
        Some(id) => match store.get_user(id).await {
            Ok(Some(user)) => user.name,
            _ => DEFAULT_ISSUER.to_string(),
        },
        None => DEFAULT_ISSUER.to_string(),
    }
}

#[derive(Clone)]
pub struct CreditService {
    store: SharedStore,
    ipfs: IpfsService,
    blockchain: BlockchainService,
    lifecycle: Arc<Mutex<()>>,
}

impl CreditService {
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

    async fn pending_submission(&self, id: Uuid) -> Result<Submission> {
        let submission = self
            .store
            .get_submission(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Submission"))?;
        if !submission.is_pending() {
            return Err(ApiError::invalid_transition(format!(
                "Submission is already {}",
                submission.status
            )));
        }
        Ok(submission)
    }

    pub async fn pending(&self) -> Result<Vec<Submission>> {
        Ok(self
            .store
            .list_submissions(&SubmissionFilter {
                status: Some(SubmissionStatus::Pending),
                ..Default::default()
            })
            .await?)
    }

    /// Approve a pending submission and issue its credits.
    pub async fn approve(&self, id: Uuid, reviewer: &User) -> Result<Submission> {
        let (mut submission, producer) = {
            let _guard = self.lifecycle.lock().await;
            let mut submission = self.pending_submission(id).await?;
            let pending = submission.clone();
            let producer = self
                .store
                .get_user(submission.producer_id)
                .await?
                .ok_or_else(|| ApiError::not_found("Producer"))?;

            let now = Utc::now();
            submission.status = SubmissionStatus::Approved;
            submission.credits = credits_for_quantity(submission.production_data.quantity);
            submission.credit_id = Some(generate_credit_id());
            submission.reviewed_by = Some(reviewer.id);
            submission.reviewed_at = Some(now);
            submission.updated_at = now;
            self.store.update_submission(&submission).await?;

            let producer = match self
                .store
                .adjust_user_credits(producer.id, submission.credits)
                .await
            {
                Ok(producer) => producer,
                Err(e) => {
                    // Balance was not credited; keep the submission pending
                    if let Err(restore) = self.store.update_submission(&pending).await {
                        error!(
                            submission_id = %pending.id,
                            error = %restore,
                            "Failed to restore submission after balance update failed"
                        );
                    }
                    return Err(e.into());
                }
            };
            (submission, producer)
        };

        let credit_id = submission.credit_id.clone().unwrap_or_default();
        counter!(metric_names::CREDITS_ISSUED_TOTAL).increment(1);
        info!(
            submission_id = %submission.id,
            credit_id = %credit_id,
            credits = %submission.credits,
            producer_id = %producer.id,
            "Submission approved"
        );

        let ipfs_hash = match CreditMetadata::issuance(&submission, &producer, &reviewer.name) {
            Some(metadata) => pin_metadata(&self.ipfs, "issuance", &metadata).await,
            None => None,
        };

        let transaction_hash = match producer.wallet_address.as_deref() {
            Some(wallet) => {
                let uri = ipfs_hash
                    .as_ref()
                    .map(|h| format!("ipfs://{}", h))
                    .unwrap_or_default();
                match self
                    .blockchain
                    .generate_credits(wallet, submission.credits, &uri)
                    .await
                {
                    Ok(hash) => Some(hash),
                    Err(e) => {
                        counter!(metric_names::EXTERNAL_FAILURES_TOTAL, "service" => "blockchain")
                            .increment(1);
                        warn!(credit_id = %credit_id, error = %e, "generateCredits failed");
                        None
                    }
                }
            }
            None => {
                warn!(producer_id = %producer.id, "Producer has no wallet, skipping on-chain mint");
                None
            }
        };

        if ipfs_hash.is_some() || transaction_hash.is_some() {
            let _guard = self.lifecycle.lock().await;
            if let Some(mut latest) = self.store.get_submission(submission.id).await? {
                latest.ipfs_hash = ipfs_hash.clone();
                latest.transaction_hash = transaction_hash.clone();
                latest.updated_at = Utc::now();
                self.store.update_submission(&latest).await?;
                submission = latest;
            }
        }

        let generation = Transaction::new(
            TransactionType::Generation,
            self.blockchain.contract_address(),
            producer.address_or_zero(),
            submission.credits,
            Decimal::ZERO,
            credit_id,
        )
        .with_hash(transaction_hash);
        self.store.insert_transaction(&generation).await?;

        Ok(submission)
    }

    pub async fn reject(&self, id: Uuid, reviewer: &User, reason: &str) -> Result<Submission> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ApiError::validation_field("reason", "A rejection reason is required"));
        }

        let _guard = self.lifecycle.lock().await;
        let mut submission = self.pending_submission(id).await?;

        let now = Utc::now();
        submission.status = SubmissionStatus::Rejected;
        submission.rejection_reason = Some(reason.to_string());
        submission.reviewed_by = Some(reviewer.id);
        submission.reviewed_at = Some(now);
        submission.updated_at = now;
        self.store.update_submission(&submission).await?;

        info!(submission_id = %submission.id, reason = %reason, "Submission rejected");
        Ok(submission)
    }

    pub async fn stats(&self) -> Result<RegulatoryStats> {
        let submissions = self
            .store
            .list_submissions(&SubmissionFilter::default())
            .await?;
        let listings = self.store.list_listings(&ListingFilter::default()).await?;

        let count = |status: SubmissionStatus| submissions.iter().filter(|s| s.status == status).count();

        Ok(RegulatoryStats {
            total_submissions: submissions.len(),
            pending_submissions: count(SubmissionStatus::Pending),
            approved_submissions: count(SubmissionStatus::Approved),
            rejected_submissions: count(SubmissionStatus::Rejected),
            total_credits_issued: submissions
                .iter()
                .filter(|s| s.status == SubmissionStatus::Approved)
                .map(|s| s.credits)
                .sum(),
            active_listings: listings.iter().filter(|l| l.is_active()).count(),
            credits_sold: listings
                .iter()
                .filter(|l| l.status == ListingStatus::Sold)
                .map(|l| l.credits)
                .sum(),
        })
    }

    async fn approved_submission(&self, credit_id: &str) -> Result<Submission> {
        self.store
            .find_submission_by_credit_id(credit_id)
            .await?
            .filter(|s| s.status == SubmissionStatus::Approved)
            .ok_or_else(|| ApiError::not_found("Credit"))
    }

    /// Every issued credit, newest first.
    pub async fn list_credits(&self) -> Result<Vec<Credit>> {
        let approved = self
            .store
            .list_submissions(&SubmissionFilter {
                status: Some(SubmissionStatus::Approved),
                ..Default::default()
            })
            .await?;
        Ok(approved.iter().filter_map(Credit::from_submission).collect())
    }

    pub async fn get_credit(&self, credit_id: &str) -> Result<CreditDetails> {
        let submission = self.approved_submission(credit_id).await?;
        let credit =
            Credit::from_submission(&submission).ok_or_else(|| ApiError::not_found("Credit"))?;

        let metadata = match (&submission.ipfs_hash, self.ipfs.is_enabled()) {
            (Some(hash), true) => match self.ipfs.fetch_json(hash).await {
                Ok(doc) => Some(doc),
                Err(e) => {
                    counter!(metric_names::EXTERNAL_FAILURES_TOTAL, "service" => "ipfs")
                        .increment(1);
                    warn!(credit_id, error = %e, "Could not fetch credit metadata");
                    None
                }
            },
            _ => None,
        };

        Ok(CreditDetails { credit, metadata })
    }

    pub async fn credits_for_user(&self, user_id: Uuid) -> Result<UserCredits> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("User"))?;

        let issued = self
            .store
            .list_submissions(&SubmissionFilter {
                producer_id: Some(user.id),
                status: Some(SubmissionStatus::Approved),
            })
            .await?
            .iter()
            .filter_map(Credit::from_submission)
            .collect();
        let purchased = self
            .store
            .list_listings(&ListingFilter {
                buyer_id: Some(user.id),
                status: Some(ListingStatus::Sold),
                ..Default::default()
            })
            .await?;

        Ok(UserCredits {
            user_id: user.id,
            total_credits: user.total_credits,
            issued,
            purchased,
        })
    }

    /// Most recent metadata pinned for the credit, read through the gateway.
    pub async fn pinned_metadata(&self, credit_id: &str) -> Result<PinnedMetadata> {
        self.approved_submission(credit_id).await?;

        let pins = self.ipfs.find_pins(credit_id).await?;
        let latest = pins
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found("Pinned metadata"))?;
        let content = self.ipfs.fetch_json(&latest.ipfs_pin_hash).await?;

        Ok(PinnedMetadata {
            credit_id: credit_id.to_string(),
            ipfs_hash: latest.ipfs_pin_hash,
            pinned_at: latest.date_pinned,
            content,
        })
    }
}
