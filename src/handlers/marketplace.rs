use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::extractors::{parse_param, ValidatedJson, ValidatedUuid};
use super::response::{ok, ok_with_message, ApiJson, Created};
use crate::database::{ListingFilter, TransactionFilter};
use crate::error::Result;
use crate::models::{MarketplaceListing, Transaction};
use crate::utils::normalize_wallet;
use crate::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingRequest {
    pub producer_id: Uuid,

    #[validate(length(min = 1, max = 64))]
    #[schema(example = "H2C-1A2B3C4D5E6F")]
    pub credit_id: String,

    #[schema(value_type = f64, example = 10.0)]
    pub credits: Decimal,

    #[schema(value_type = f64, example = 0.05)]
    pub price_per_credit: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseListingRequest {
    pub buyer_id: Uuid,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelListingRequest {
    pub producer_id: Uuid,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct ListListingsQuery {
    /// ACTIVE, SOLD or CANCELLED
    pub status: Option<String>,
    pub producer_id: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct ListTransactionsQuery {
    /// Matches either side of the transaction
    pub address: Option<String>,
    pub credit_id: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/listings", get(list_listings).post(create_listing))
        .route("/listings/{id}", get(get_listing))
        .route("/listings/{id}/purchase", post(purchase_listing))
        .route("/listings/{id}/cancel", post(cancel_listing))
        .route("/transactions", get(list_transactions))
}

#[utoipa::path(
    get,
    path = "/api/marketplace/listings",
    tag = "marketplace",
    params(ListListingsQuery),
    responses((status = 200, description = "Listings, newest first", body = [MarketplaceListing]))
)]
pub async fn list_listings(
    State(state): State<AppState>,
    Query(query): Query<ListListingsQuery>,
) -> Result<ApiJson<Vec<MarketplaceListing>>> {
    let filter = ListingFilter {
        status: parse_param(query.status.as_deref(), "status")?,
        producer_id: ValidatedUuid::parse_optional(query.producer_id.as_deref(), "producerId")?,
        ..Default::default()
    };
    Ok(ok(state.marketplace_service.list_listings(&filter).await?))
}

/// Offer part of an approved credit for sale
#[utoipa::path(
    post,
    path = "/api/marketplace/listings",
    tag = "marketplace",
    request_body = CreateListingRequest,
    responses(
        (status = 201, description = "Listing created", body = MarketplaceListing),
        (status = 400, description = "Invalid amount or insufficient credits"),
        (status = 403, description = "Credit belongs to another producer"),
        (status = 404, description = "Credit or producer not found")
    )
)]
pub async fn create_listing(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateListingRequest>,
) -> Result<Created<MarketplaceListing>> {
    let listing = state
        .marketplace_service
        .create_listing(
            request.producer_id,
            request.credit_id.trim(),
            request.credits,
            request.price_per_credit,
        )
        .await?;
    Ok(Created(listing))
}

#[utoipa::path(
    get,
    path = "/api/marketplace/listings/{id}",
    tag = "marketplace",
    params(("id" = String, Path, description = "Listing id")),
    responses(
        (status = 200, description = "Listing", body = MarketplaceListing),
        (status = 404, description = "Listing not found")
    )
)]
pub async fn get_listing(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiJson<MarketplaceListing>> {
    let id = ValidatedUuid::parse(&id)?;
    Ok(ok(state.marketplace_service.get_listing(id).await?))
}

/// Buy every credit in an active listing
#[utoipa::path(
    post,
    path = "/api/marketplace/listings/{id}/purchase",
    tag = "marketplace",
    params(("id" = String, Path, description = "Listing id")),
    request_body = PurchaseListingRequest,
    responses(
        (status = 200, description = "Listing sold", body = MarketplaceListing),
        (status = 400, description = "Producer buying their own listing"),
        (status = 403, description = "User is not a buyer"),
        (status = 404, description = "Listing or buyer not found"),
        (status = 409, description = "Listing no longer active")
    )
)]
pub async fn purchase_listing(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<PurchaseListingRequest>,
) -> Result<ApiJson<MarketplaceListing>> {
    let id = ValidatedUuid::parse(&id)?;
    let listing = state
        .marketplace_service
        .purchase(id, request.buyer_id)
        .await?;
    Ok(ok_with_message(listing, "Credits transferred"))
}

#[utoipa::path(
    post,
    path = "/api/marketplace/listings/{id}/cancel",
    tag = "marketplace",
    params(("id" = String, Path, description = "Listing id")),
    request_body = CancelListingRequest,
    responses(
        (status = 200, description = "Listing cancelled", body = MarketplaceListing),
        (status = 403, description = "Listing belongs to another producer"),
        (status = 409, description = "Listing no longer active")
    )
)]
pub async fn cancel_listing(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<CancelListingRequest>,
) -> Result<ApiJson<MarketplaceListing>> {
    let id = ValidatedUuid::parse(&id)?;
    let listing = state
        .marketplace_service
        .cancel(id, request.producer_id)
        .await?;
    Ok(ok_with_message(listing, "Listing cancelled"))
}

#[utoipa::path(
    get,
    path = "/api/marketplace/transactions",
    tag = "marketplace",
    params(ListTransactionsQuery),
    responses((status = 200, description = "Ledger entries, newest first", body = [Transaction]))
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<ApiJson<Vec<Transaction>>> {
    let filter = TransactionFilter {
        address: query
            .address
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .map(normalize_wallet),
        credit_id: query
            .credit_id
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
    };
    Ok(ok(state.marketplace_service.transactions(&filter).await?))
}
