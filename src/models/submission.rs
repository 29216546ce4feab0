use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Review status of a production claim
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(format!("Unknown submission status: {}", s)),
        }
    }
}

/// Hydrogen production being claimed
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductionData {
    #[sqlx(rename = "production_date")]
    pub date: NaiveDate,
    #[schema(value_type = f64)]
    pub quantity: Decimal,
    pub location: String,
}

/// Producer claim awaiting or past regulatory review
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,
    pub producer_id: Uuid,
    #[sqlx(flatten)]
    pub production_data: ProductionData,
    pub status: SubmissionStatus,
    #[schema(value_type = f64)]
    pub credits: Decimal,
    pub credit_id: Option<String>,
    #[schema(value_type = f64)]
    pub listed_credits: Decimal,
    pub ipfs_hash: Option<String>,
    pub transaction_hash: Option<String>,
    pub rejection_reason: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    pub fn new(producer_id: Uuid, production_data: ProductionData) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            producer_id,
            production_data,
            status: SubmissionStatus::Pending,
            credits: Decimal::ZERO,
            credit_id: None,
            listed_credits: Decimal::ZERO,
            ipfs_hash: None,
            transaction_hash: None,
            rejection_reason: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Issued credits not yet put on the marketplace.
    pub fn available_credits(&self) -> Decimal {
        (self.credits - self.listed_credits).max(Decimal::ZERO)
    }

    pub fn is_pending(&self) -> bool {
        self.status == SubmissionStatus::Pending
    }
}
