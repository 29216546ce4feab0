use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};

use super::extractors::ValidatedUuid;
use super::response::{ok, ApiJson};
use crate::error::Result;
use crate::models::Credit;
use crate::services::{CreditDetails, PinnedMetadata, UserCredits};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_credits))
        .route("/user/{user_id}", get(credits_for_user))
        .route("/{credit_id}", get(get_credit))
        .route("/{credit_id}/metadata", get(get_credit_metadata))
}

#[utoipa::path(
    get,
    path = "/api/credits",
    tag = "credits",
    responses((status = 200, description = "Issued credits, newest first", body = [Credit]))
)]
pub async fn list_credits(State(state): State<AppState>) -> Result<ApiJson<Vec<Credit>>> {
    Ok(ok(state.credit_service.list_credits().await?))
}

/// Credit view with the metadata pinned at issuance
#[utoipa::path(
    get,
    path = "/api/credits/{creditId}",
    tag = "credits",
    params(("creditId" = String, Path, description = "Credit id, e.g. H2C-1A2B3C4D5E6F")),
    responses(
        (status = 200, description = "Credit", body = CreditDetails),
        (status = 404, description = "No approved submission carries this credit id")
    )
)]
pub async fn get_credit(
    State(state): State<AppState>,
    Path(credit_id): Path<String>,
) -> Result<ApiJson<CreditDetails>> {
    Ok(ok(state.credit_service.get_credit(credit_id.trim()).await?))
}

#[utoipa::path(
    get,
    path = "/api/credits/user/{userId}",
    tag = "credits",
    params(("userId" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Holdings of the user", body = UserCredits),
        (status = 404, description = "User not found")
    )
)]
pub async fn credits_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<ApiJson<UserCredits>> {
    let user_id = ValidatedUuid::parse(&user_id)?;
    Ok(ok(state.credit_service.credits_for_user(user_id).await?))
}

/// Latest document pinned to IPFS for the credit
#[utoipa::path(
    get,
    path = "/api/credits/{creditId}/metadata",
    tag = "credits",
    params(("creditId" = String, Path, description = "Credit id")),
    responses(
        (status = 200, description = "Pinned metadata", body = PinnedMetadata),
        (status = 404, description = "Credit unknown or nothing pinned"),
        (status = 502, description = "Pinata disabled or unreachable")
    )
)]
pub async fn get_credit_metadata(
    State(state): State<AppState>,
    Path(credit_id): Path<String>,
) -> Result<ApiJson<PinnedMetadata>> {
    Ok(ok(state.credit_service.pinned_metadata(credit_id.trim()).await?))
}
