use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Marketplace roles
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Producer,
    Buyer,
    RegulatoryAuthority,
    Verifier,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Producer => "PRODUCER",
            Self::Buyer => "BUYER",
            Self::RegulatoryAuthority => "REGULATORY_AUTHORITY",
            Self::Verifier => "VERIFIER",
        }
    }

    /// Roles a user may pick when registering with a wallet.
    pub fn is_self_registrable(&self) -> bool {
        !matches!(self, Self::RegulatoryAuthority)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PRODUCER" => Ok(Self::Producer),
            "BUYER" => Ok(Self::Buyer),
            "REGULATORY_AUTHORITY" => Ok(Self::RegulatoryAuthority),
            "VERIFIER" => Ok(Self::Verifier),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Stored user record.
///
/// Producers, buyers and verifiers are identified by wallet address; the regulatory
/// authority signs in with email and password instead.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub wallet_address: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: UserRole,
    pub total_credits: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: impl Into<String>, wallet_address: Option<String>, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            wallet_address,
            email: None,
            password_hash: None,
            role,
            total_credits: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// Wallet address or the zero address for accounts without one.
    pub fn address_or_zero(&self) -> String {
        self.wallet_address
            .clone()
            .unwrap_or_else(|| crate::constants::ZERO_ADDRESS.to_string())
    }
}

/// User as returned by the API (never exposes the password hash)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub wallet_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: UserRole,
    #[schema(value_type = f64)]
    pub total_credits: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            wallet_address: user.wallet_address,
            email: user.email,
            role: user.role,
            total_credits: user.total_credits,
            created_at: user.created_at,
        }
    }
}
