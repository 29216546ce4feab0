// Ledger of credit movements, one row per generation, listing, sale or delisting

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Generation,
    Listing,
    Purchase,
    Delisting,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generation => "GENERATION",
            Self::Listing => "LISTING",
            Self::Purchase => "PURCHASE",
            Self::Delisting => "DELISTING",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub from_address: String,
    pub to_address: String,
    #[schema(value_type = f64)]
    pub credits: Decimal,
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub transaction_hash: Option<String>,
    pub credit_id: String,
    pub listing_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        tx_type: TransactionType,
        from_address: impl Into<String>,
        to_address: impl Into<String>,
        credits: Decimal,
        price: Decimal,
        credit_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tx_type,
            from_address: from_address.into(),
            to_address: to_address.into(),
            credits,
            price,
            transaction_hash: None,
            credit_id: credit_id.into(),
            listing_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_hash(mut self, hash: Option<String>) -> Self {
        self.transaction_hash = hash;
        self
    }

    pub fn with_listing(mut self, listing_id: Uuid) -> Self {
        self.listing_id = Some(listing_id);
        self
    }

    /// Whether the address is on either side of the movement.
    pub fn involves(&self, address: &str) -> bool {
        self.from_address.eq_ignore_ascii_case(address)
            || self.to_address.eq_ignore_ascii_case(address)
    }
}
