use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::{Claims, TOKEN_ISSUER};
use crate::error::{ApiError, ErrorCode, Result};
use crate::models::User;

/// HS256 token issuing and verification
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration: i64,
}

impl JwtService {
    pub fn new(secret: &str, expiration: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration,
        }
    }

    /// Token lifetime in seconds
    pub fn expiration(&self) -> i64 {
        self.expiration
    }

    pub fn issue_token(&self, user: &User) -> Result<String> {
        let claims = Claims::new(
            user.id,
            user.email.clone().unwrap_or_default(),
            user.role,
            self.expiration,
        );
        self.encode_token(&claims)
    }

    pub fn encode_token(&self, claims: &Claims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("Failed to sign token: {}", e)))
    }

    pub fn decode_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::with_code(ErrorCode::TokenExpired, "Token has expired")
                }
                _ => ApiError::with_code(ErrorCode::TokenInvalid, "Invalid token"),
            })
    }
}
