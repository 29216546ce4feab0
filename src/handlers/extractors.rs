//! Request extractors shared by the API handlers.

use std::str::FromStr;

use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use uuid::Uuid;
use validator::Validate;

use crate::error::{handle_rejection, ApiError};

/// JSON body that has passed its `validator` rules.
///
/// Malformed bodies and rule violations both surface as 400 [`ApiError`]s.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(handle_rejection)?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Validated UUID helper for path segments
pub struct ValidatedUuid;

impl ValidatedUuid {
    pub fn parse(s: &str) -> Result<Uuid, ApiError> {
        Uuid::parse_str(s.trim())
            .map_err(|_| ApiError::validation_field("id", format!("Invalid UUID: {}", s)))
    }

    pub fn parse_optional(s: Option<&str>, field: &str) -> Result<Option<Uuid>, ApiError> {
        s.filter(|v| !v.trim().is_empty())
            .map(|v| {
                Uuid::parse_str(v.trim())
                    .map_err(|_| ApiError::validation_field(field, format!("Invalid UUID: {}", v)))
            })
            .transpose()
    }
}

/// Parse an optional enum-like query parameter, ignoring empty values.
pub fn parse_param<T>(value: Option<&str>, field: &str) -> Result<Option<T>, ApiError>
where
    T: FromStr<Err = String>,
{
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| T::from_str(v.trim()).map_err(|e| ApiError::validation_field(field, e)))
        .transpose()
}
