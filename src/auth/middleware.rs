use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::auth::Claims;
use crate::error::{ApiError, ErrorCode, Result};
use crate::models::UserRole;
use crate::AppState;

fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Admits only requests carrying a valid regulatory authority token.
///
/// The decoded [`Claims`] are stored in the request extensions for
/// [`AuthenticatedUser`].
pub async fn require_regulatory(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response> {
    let token = bearer_token(&request).ok_or_else(|| {
        ApiError::with_code(
            ErrorCode::TokenMissing,
            "Missing or invalid Authorization header",
        )
    })?;

    let claims = state.jwt_service.decode_token(token)?;

    if !claims.has_role(UserRole::RegulatoryAuthority) {
        debug!(user_id = %claims.sub, role = %claims.role, "Rejected non-regulatory token");
        return Err(ApiError::role_not_authorized(
            "Regulatory authority access required",
        ));
    }

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Extractor for authenticated user claims
#[derive(Clone)]
pub struct AuthenticatedUser(pub Claims);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<Claims>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("No authentication found".to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}
