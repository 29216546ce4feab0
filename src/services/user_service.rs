use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::PasswordService;
use crate::config::RegulatoryConfig;
use crate::database::{SharedStore, StoreError};
use crate::error::{ApiError, Result};
use crate::models::{User, UserRole};
use crate::utils::validation::{is_valid_wallet, normalize_wallet};

/// Registration, wallet lookup and regulatory sign-in
#[derive(Clone)]
pub struct UserService {
    store: SharedStore,
}

impl UserService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    fn checked_wallet(wallet_address: &str) -> Result<String> {
        let wallet = normalize_wallet(wallet_address);
        if !is_valid_wallet(&wallet) {
            return Err(ApiError::invalid_wallet());
        }
        Ok(wallet)
    }

    pub async fn register(&self, name: &str, wallet_address: &str, role: UserRole) -> Result<User> {
        if !role.is_self_registrable() {
            return Err(ApiError::role_not_authorized(
                "The regulatory authority cannot self-register",
            ));
        }
        let name = name.trim();
        if name.is_empty() || name.chars().count() > 100 {
            return Err(ApiError::validation_field(
                "name",
                "Name must be between 1 and 100 characters",
            ));
        }
        let wallet = Self::checked_wallet(wallet_address)?;

        if self.store.find_user_by_wallet(&wallet).await?.is_some() {
            return Err(ApiError::already_exists("User with this wallet address"));
        }

        let user = User::new(name, Some(wallet), role);
        match self.store.insert_user(&user).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => {
                return Err(ApiError::already_exists("User with this wallet address"))
            }
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %user.id, role = %user.role, "User registered");
        Ok(user)
    }

    /// User registered for the wallet; used by the dashboard's connect flow.
    pub async fn connect_wallet(&self, wallet_address: &str) -> Result<User> {
        let wallet = Self::checked_wallet(wallet_address)?;
        self.store
            .find_user_by_wallet(&wallet)
            .await?
            .ok_or_else(|| ApiError::not_found("User"))
    }

    pub async fn get(&self, id: Uuid) -> Result<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| ApiError::not_found("User"))
    }

    pub async fn get_by_wallet(&self, wallet_address: &str) -> Result<User> {
        self.connect_wallet(wallet_address).await
    }

    pub async fn list(&self, role: Option<UserRole>) -> Result<Vec<User>> {
        Ok(self.store.list_users(role).await?)
    }

    /// Verify regulatory authority credentials.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let user = self
            .store
            .find_user_by_email(email.trim())
            .await?
            .filter(|u| u.role == UserRole::RegulatoryAuthority)
            .ok_or_else(ApiError::invalid_credentials)?;

        let hash = user
            .password_hash
            .as_deref()
            .ok_or_else(ApiError::invalid_credentials)?;
        if !PasswordService::verify_password(password, hash)? {
            warn!(email = %email, "Failed regulatory login");
            return Err(ApiError::invalid_credentials());
        }

        Ok(user)
    }

    /// Make sure the configured regulatory authority account exists.
    pub async fn seed_regulatory_authority(&self, config: &RegulatoryConfig) -> Result<User> {
        if let Some(existing) = self.store.find_user_by_email(&config.email).await? {
            if existing.role != UserRole::RegulatoryAuthority {
                return Err(ApiError::Configuration(format!(
                    "{} belongs to a {} account",
                    config.email, existing.role
                )));
            }
            info!(user_id = %existing.id, "Regulatory authority account present");
            return Ok(existing);
        }

        let mut authority = User::new(config.name.clone(), None, UserRole::RegulatoryAuthority);
        authority.email = Some(config.email.clone());
        authority.password_hash = Some(PasswordService::hash_password(&config.password)?);
        self.store.insert_user(&authority).await?;

        info!(user_id = %authority.id, email = %config.email, "Regulatory authority account created");
        Ok(authority)
    }
}
