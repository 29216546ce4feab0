use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::extractors::{parse_param, ValidatedJson, ValidatedUuid};
use super::response::{ok, ApiJson, Created};
use crate::database::SubmissionFilter;
use crate::error::Result;
use crate::models::{ProductionData, Submission};
use crate::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductionDataRequest {
    #[schema(value_type = String, format = Date, example = "2024-05-01")]
    pub date: NaiveDate,

    /// Kilograms of hydrogen produced
    #[schema(value_type = f64, example = 2500.0)]
    pub quantity: Decimal,

    #[validate(length(min = 1, max = 200))]
    #[schema(example = "Esbjerg, DK")]
    pub location: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubmissionRequest {
    pub producer_id: Uuid,

    #[validate(nested)]
    pub production_data: ProductionDataRequest,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct ListSubmissionsQuery {
    pub producer_id: Option<String>,
    /// PENDING, APPROVED or REJECTED
    pub status: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_submission).get(list_submissions))
        .route("/{id}", get(get_submission))
}

/// Submit hydrogen production for regulatory review
#[utoipa::path(
    post,
    path = "/api/submissions",
    tag = "submissions",
    request_body = CreateSubmissionRequest,
    responses(
        (status = 201, description = "Submission pending review", body = Submission),
        (status = 400, description = "Invalid production data"),
        (status = 403, description = "User is not a producer"),
        (status = 404, description = "Producer not found")
    )
)]
pub async fn create_submission(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateSubmissionRequest>,
) -> Result<Created<Submission>> {
    let data = request.production_data;
    let submission = state
        .submission_service
        .create(
            request.producer_id,
            ProductionData {
                date: data.date,
                quantity: data.quantity,
                location: data.location,
            },
        )
        .await?;
    Ok(Created(submission))
}

#[utoipa::path(
    get,
    path = "/api/submissions",
    tag = "submissions",
    params(ListSubmissionsQuery),
    responses((status = 200, description = "Submissions, newest first", body = [Submission]))
)]
pub async fn list_submissions(
    State(state): State<AppState>,
    Query(query): Query<ListSubmissionsQuery>,
) -> Result<ApiJson<Vec<Submission>>> {
    let filter = SubmissionFilter {
        producer_id: ValidatedUuid::parse_optional(query.producer_id.as_deref(), "producerId")?,
        status: parse_param(query.status.as_deref(), "status")?,
    };
    Ok(ok(state.submission_service.list(&filter).await?))
}

#[utoipa::path(
    get,
    path = "/api/submissions/{id}",
    tag = "submissions",
    params(("id" = String, Path, description = "Submission id")),
    responses(
        (status = 200, description = "Submission", body = Submission),
        (status = 404, description = "Submission not found")
    )
)]
pub async fn get_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiJson<Submission>> {
    let id = ValidatedUuid::parse(&id)?;
    Ok(ok(state.submission_service.get(id).await?))
}
