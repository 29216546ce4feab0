//! Router configuration: public API, regulatory routes and the OpenAPI document.

use std::time::Duration;

use axum::{http::StatusCode, middleware, routing::get, Json, Router};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::app_state::AppState;
use crate::handlers::{credits, health, marketplace, metrics, regulatory, submissions, users};
use crate::middleware::{metrics_middleware, request_logger_middleware};

#[derive(OpenApi)]
#[openapi(
    info(title = "Green Hydrogen Credit API", version = "0.1.0"),
    paths(
        health::health_check,
        metrics::get_prometheus_metrics,
        users::register_user,
        users::connect_wallet,
        users::list_users,
        users::get_user,
        users::get_user_by_wallet,
        submissions::create_submission,
        submissions::list_submissions,
        submissions::get_submission,
        regulatory::login,
        regulatory::list_pending,
        regulatory::approve_submission,
        regulatory::reject_submission,
        regulatory::stats,
        marketplace::list_listings,
        marketplace::create_listing,
        marketplace::get_listing,
        marketplace::purchase_listing,
        marketplace::cancel_listing,
        marketplace::list_transactions,
        credits::list_credits,
        credits::get_credit,
        credits::credits_for_user,
        credits::get_credit_metadata,
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness and adapter modes"),
        (name = "users", description = "Wallet-based accounts"),
        (name = "submissions", description = "Production claims"),
        (name = "regulatory", description = "Review and credit issuance"),
        (name = "marketplace", description = "Listings, purchases and the transaction ledger"),
        (name = "credits", description = "Issued credit views and IPFS metadata"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the application router.
pub fn build_router(app_state: AppState) -> Router {
    let timeout = Duration::from_secs(app_state.config.request_timeout);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::get_prometheus_metrics))
        .route("/api/docs/openapi.json", get(openapi_json))
        .nest("/api/users", users::routes())
        .nest("/api/submissions", submissions::routes())
        .nest("/api/regulatory", regulatory::routes(app_state.clone()))
        .nest("/api/marketplace", marketplace::routes())
        .nest("/api/credits", credits::routes())
        .layer(middleware::from_fn(metrics_middleware))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_logger_middleware))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    timeout,
                ))
                .layer(CorsLayer::permissive()),
        )
        .with_state(app_state)
}
