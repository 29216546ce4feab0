use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::UserRole;

pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::JwtService;
pub use middleware::{require_regulatory, AuthenticatedUser};
pub use password::PasswordService;

pub const TOKEN_ISSUER: &str = "h2-credit-api";

/// JWT claims issued to the regulatory authority
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    pub sub: Uuid,     // User id
    pub email: String,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

impl Claims {
    pub fn new(user_id: Uuid, email: String, role: UserRole, ttl_seconds: i64) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            email,
            role,
            exp: (now + chrono::Duration::seconds(ttl_seconds)).timestamp(),
            iat: now.timestamp(),
            iss: TOKEN_ISSUER.to_string(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    pub fn has_role(&self, role: UserRole) -> bool {
        self.role == role
    }
}

/// Login response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: crate::models::UserResponse,
}
