//! Credit views and the metadata document pinned to IPFS.
//!
//! Credits are not stored as records of their own: an approved submission carries the
//! issued amount and its credit id, and the marketplace moves balances between users.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{ProductionData, Submission, SubmissionStatus, User};
use crate::constants::{CREDIT_DIVISOR, CREDIT_ID_PREFIX, CREDIT_STANDARD};

/// Credits backed by a production quantity.
pub fn credits_for_quantity(quantity: Decimal) -> Decimal {
    (quantity / Decimal::from(CREDIT_DIVISOR)).normalize()
}

/// New credit identifier, e.g. `H2C-3F2A9C1B7D4E`.
pub fn generate_credit_id() -> String {
    let raw = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("{}{}", CREDIT_ID_PREFIX, &raw[..12])
}

/// Issued credit as exposed by the credits API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Credit {
    pub credit_id: String,
    pub submission_id: Uuid,
    pub producer_id: Uuid,
    #[schema(value_type = f64)]
    pub credits: Decimal,
    #[schema(value_type = f64)]
    pub listed_credits: Decimal,
    #[schema(value_type = f64)]
    pub available_credits: Decimal,
    pub ipfs_hash: Option<String>,
    pub transaction_hash: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
}

impl Credit {
    /// Credit view of a submission; `None` until it has been approved.
    pub fn from_submission(submission: &Submission) -> Option<Self> {
        if submission.status != SubmissionStatus::Approved {
            return None;
        }
        let credit_id = submission.credit_id.clone()?;
        Some(Self {
            credit_id,
            submission_id: submission.id,
            producer_id: submission.producer_id,
            credits: submission.credits,
            listed_credits: submission.listed_credits,
            available_credits: submission.available_credits(),
            ipfs_hash: submission.ipfs_hash.clone(),
            transaction_hash: submission.transaction_hash.clone(),
            issued_at: submission.reviewed_at,
        })
    }
}

/// Party recorded in credit metadata
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreditOwner {
    pub id: Uuid,
    pub name: String,
    pub wallet_address: Option<String>,
}

impl From<&User> for CreditOwner {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            wallet_address: user.wallet_address.clone(),
        }
    }
}

/// Ownership change appended to metadata on a marketplace sale
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    pub from: CreditOwner,
    pub to: CreditOwner,
    #[schema(value_type = f64)]
    pub credits: Decimal,
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub listing_id: Uuid,
    pub at: DateTime<Utc>,
}

/// JSON document pinned to IPFS for every issued credit and every transfer
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreditMetadata {
    pub credit_id: String,
    pub standard: String,
    pub producer: CreditOwner,
    pub owner: CreditOwner,
    pub production_data: ProductionData,
    #[schema(value_type = f64)]
    pub credits: Decimal,
    pub issued_at: DateTime<Utc>,
    pub issuer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer: Option<TransferRecord>,
}

impl CreditMetadata {
    pub fn issuance(submission: &Submission, producer: &User, issuer: &str) -> Option<Self> {
        let credit = Credit::from_submission(submission)?;
        Some(Self {
            credit_id: credit.credit_id,
            standard: CREDIT_STANDARD.to_string(),
            producer: CreditOwner::from(producer),
            owner: CreditOwner::from(producer),
            production_data: submission.production_data.clone(),
            credits: submission.credits,
            issued_at: submission.reviewed_at.unwrap_or_else(Utc::now),
            issuer: issuer.to_string(),
            transfer: None,
        })
    }

    /// Metadata after `transfer` moved the credits to a new owner.
    pub fn transferred(mut self, transfer: TransferRecord) -> Self {
        self.owner = transfer.to.clone();
        self.transfer = Some(transfer);
        self
    }
}
