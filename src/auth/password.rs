use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::{ApiError, Result};

pub struct PasswordService;

impl PasswordService {
    pub fn hash_password(password: &str) -> Result<String> {
        Self::hash_with_cost(password, DEFAULT_COST)
    }

    pub fn hash_with_cost(password: &str, cost: u32) -> Result<String> {
        hash(password, cost).map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))
    }

    pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
        verify(password, password_hash)
            .map_err(|e| ApiError::Internal(format!("Password verification failed: {}", e)))
    }
}
