//! Regulatory authority endpoints.
//!
//! `/login` is public; every other route requires a bearer token carrying the
//! `REGULATORY_AUTHORITY` role, enforced by [`require_regulatory`].

use axum::{
    extract::{Path, State},
    middleware,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

use super::extractors::{ValidatedJson, ValidatedUuid};
use super::response::{ok, ok_with_message, ApiJson};
use crate::auth::{require_regulatory, AuthResponse, AuthenticatedUser};
use crate::error::{ApiError, Result};
use crate::models::{Submission, User};
use crate::services::RegulatoryStats;
use crate::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    #[schema(example = "regulator@h2credits.local")]
    pub email: String,

    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RejectSubmissionRequest {
    #[validate(length(min = 1, max = 500))]
    #[schema(example = "Metering data does not match grid records")]
    pub reason: String,
}

/// Regulatory routes; the protected half is wrapped in the role check.
pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/submissions/pending", get(list_pending))
        .route("/submissions/{id}/approve", post(approve_submission))
        .route("/submissions/{id}/reject", post(reject_submission))
        .route("/stats", get(stats))
        .route_layer(middleware::from_fn_with_state(state, require_regulatory));

    Router::new()
        .route("/login", post(login))
        .merge(protected)
}

async fn reviewer(state: &AppState, user: &AuthenticatedUser) -> Result<User> {
    state
        .user_service
        .get(user.0.sub)
        .await
        .map_err(|_| ApiError::Unauthorized("Reviewer account no longer exists".to_string()))
}

/// Exchange regulatory credentials for a bearer token
#[utoipa::path(
    post,
    path = "/api/regulatory/login",
    tag = "regulatory",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<ApiJson<AuthResponse>> {
    let user = state
        .user_service
        .authenticate(&request.email, &request.password)
        .await?;
    let access_token = state.jwt_service.issue_token(&user)?;

    info!(user_id = %user.id, "Regulatory authority signed in");
    Ok(ok(AuthResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt_service.expiration(),
        user: user.into(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/regulatory/submissions/pending",
    tag = "regulatory",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Submissions awaiting review", body = [Submission]),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Not a regulatory authority")
    )
)]
pub async fn list_pending(State(state): State<AppState>) -> Result<ApiJson<Vec<Submission>>> {
    Ok(ok(state.credit_service.pending().await?))
}

/// Approve a submission and issue its credits
#[utoipa::path(
    post,
    path = "/api/regulatory/submissions/{id}/approve",
    tag = "regulatory",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Submission id")),
    responses(
        (status = 200, description = "Credits issued", body = Submission),
        (status = 404, description = "Submission not found"),
        (status = 409, description = "Submission already reviewed")
    )
)]
pub async fn approve_submission(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<ApiJson<Submission>> {
    let id = ValidatedUuid::parse(&id)?;
    let reviewer = reviewer(&state, &user).await?;
    let submission = state.credit_service.approve(id, &reviewer).await?;
    Ok(ok_with_message(submission, "Credits generated"))
}

#[utoipa::path(
    post,
    path = "/api/regulatory/submissions/{id}/reject",
    tag = "regulatory",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Submission id")),
    request_body = RejectSubmissionRequest,
    responses(
        (status = 200, description = "Submission rejected", body = Submission),
        (status = 404, description = "Submission not found"),
        (status = 409, description = "Submission already reviewed")
    )
)]
pub async fn reject_submission(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<RejectSubmissionRequest>,
) -> Result<ApiJson<Submission>> {
    let id = ValidatedUuid::parse(&id)?;
    let reviewer = reviewer(&state, &user).await?;
    let submission = state
        .credit_service
        .reject(id, &reviewer, &request.reason)
        .await?;
    Ok(ok_with_message(submission, "Submission rejected"))
}

#[utoipa::path(
    get,
    path = "/api/regulatory/stats",
    tag = "regulatory",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Dashboard counters", body = RegulatoryStats))
)]
pub async fn stats(State(state): State<AppState>) -> Result<ApiJson<RegulatoryStats>> {
    Ok(ok(state.credit_service.stats().await?))
}
