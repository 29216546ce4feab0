use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingStatus {
    Active,
    Sold,
    Cancelled,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Sold => "SOLD",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ListingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "SOLD" => Ok(Self::Sold),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown listing status: {}", s)),
        }
    }
}

/// Credits offered for sale by a producer
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceListing {
    pub id: Uuid,
    pub credit_id: String,
    pub producer_id: Uuid,
    #[schema(value_type = f64)]
    pub credits: Decimal,
    #[schema(value_type = f64)]
    pub price_per_credit: Decimal,
    #[schema(value_type = f64)]
    pub total_price: Decimal,
    pub status: ListingStatus,
    pub buyer_id: Option<Uuid>,
    pub transaction_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sold_at: Option<DateTime<Utc>>,
}

impl MarketplaceListing {
    /// New active listing; `None` when the total price does not fit a `Decimal`.
    pub fn new(
        credit_id: impl Into<String>,
        producer_id: Uuid,
        credits: Decimal,
        price_per_credit: Decimal,
    ) -> Option<Self> {
        let total_price = credits.checked_mul(price_per_credit)?;
        Some(Self {
            id: Uuid::new_v4(),
            credit_id: credit_id.into(),
            producer_id,
            credits,
            price_per_credit,
            total_price,
            status: ListingStatus::Active,
            buyer_id: None,
            transaction_hash: None,
            created_at: Utc::now(),
            sold_at: None,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == ListingStatus::Active
    }
}
