use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::extractors::{parse_param, ValidatedJson, ValidatedUuid};
use super::response::{ok, ApiJson, Created};
use crate::error::Result;
use crate::models::{UserResponse, UserRole};
use crate::utils::validate_wallet;
use crate::AppState;

/// Wallet registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "Nordic Electrolysis AS")]
    pub name: String,

    #[validate(custom(function = "validate_wallet"))]
    #[schema(example = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8")]
    pub wallet_address: String,

    pub role: UserRole,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectWalletRequest {
    #[validate(custom(function = "validate_wallet"))]
    pub wallet_address: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListUsersQuery {
    /// PRODUCER, BUYER, VERIFIER or REGULATORY_AUTHORITY
    pub role: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(register_user).get(list_users))
        .route("/connect", post(connect_wallet))
        .route("/wallet/{address}", get(get_user_by_wallet))
        .route("/{id}", get(get_user))
}

/// Register a producer, buyer or verifier by wallet
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "users",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "User registered", body = UserResponse),
        (status = 400, description = "Invalid name, wallet or role"),
        (status = 403, description = "Role cannot self-register"),
        (status = 409, description = "Wallet already registered")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RegisterUserRequest>,
) -> Result<Created<UserResponse>> {
    let user = state
        .user_service
        .register(&request.name, &request.wallet_address, request.role)
        .await?;
    Ok(Created(user.into()))
}

/// Look up the account behind a connected wallet
#[utoipa::path(
    post,
    path = "/api/users/connect",
    tag = "users",
    request_body = ConnectWalletRequest,
    responses(
        (status = 200, description = "Registered user", body = UserResponse),
        (status = 404, description = "Wallet not registered")
    )
)]
pub async fn connect_wallet(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ConnectWalletRequest>,
) -> Result<ApiJson<UserResponse>> {
    let user = state
        .user_service
        .connect_wallet(&request.wallet_address)
        .await?;
    Ok(ok(user.into()))
}

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    params(ListUsersQuery),
    responses((status = 200, description = "Users, oldest first", body = [UserResponse]))
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<ApiJson<Vec<UserResponse>>> {
    let role: Option<UserRole> = parse_param(query.role.as_deref(), "role")?;
    let users = state.user_service.list(role).await?;
    Ok(ok(users.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiJson<UserResponse>> {
    let id = ValidatedUuid::parse(&id)?;
    let user = state.user_service.get(id).await?;
    Ok(ok(user.into()))
}

#[utoipa::path(
    get,
    path = "/api/users/wallet/{address}",
    tag = "users",
    params(("address" = String, Path, description = "Wallet address")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 404, description = "Wallet not registered")
    )
)]
pub async fn get_user_by_wallet(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<ApiJson<UserResponse>> {
    let user = state.user_service.get_by_wallet(&address).await?;
    Ok(ok(user.into()))
}
