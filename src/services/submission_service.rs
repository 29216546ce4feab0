use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::database::{SharedStore, SubmissionFilter};
use crate::error::{ApiError, ErrorCode, Result};
use crate::models::credit::credits_for_quantity;
use crate::models::{ProductionData, Submission, UserRole};

#[derive(Clone)]
pub struct SubmissionService {
    store: SharedStore,
}

impl SubmissionService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn create(&self, producer_id: Uuid, production: ProductionData) -> Result<Submission> {
        if production.quantity <= Decimal::ZERO {
            return Err(ApiError::WithCode(
                ErrorCode::InvalidAmount,
                "Quantity must be greater than zero".to_string(),
            ));
        }
        if credits_for_quantity(production.quantity).is_zero() {
            return Err(ApiError::with_code(
                ErrorCode::InvalidAmount,
                "Quantity is too small to back any credits",
            ));
        }
        let location = production.location.trim().to_string();
        if location.is_empty() {
            return Err(ApiError::validation_field("location", "Location is required"));
        }

        let producer = self
            .store
            .get_user(producer_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Producer"))?;
        if producer.role != UserRole::Producer {
            return Err(ApiError::role_not_authorized(
                "Only producers can submit production data",
            ));
        }

        let submission = Submission::new(
            producer.id,
            ProductionData {
                location,
                ..production
            },
        );
        self.store.insert_submission(&submission).await?;

        info!(
            submission_id = %submission.id,
            producer_id = %producer.id,
            quantity = %submission.production_data.quantity,
            "Production submitted"
        );
        Ok(submission)
    }

    pub async fn get(&self, id: Uuid) -> Result<Submission> {
        self.store
            .get_submission(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Submission"))
    }

    /// Newest first
    pub async fn list(&self, filter: &SubmissionFilter) -> Result<Vec<Submission>> {
        Ok(self.store.list_submissions(filter).await?)
    }
}
