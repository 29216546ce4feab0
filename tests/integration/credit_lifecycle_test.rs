// Credit lifecycle integration tests
// Registration, submission, regulatory review and the credit views, driven
// through the full router against a temporary file store.

mod common;

use anyhow::{Context, Result};
use axum::http::{Method, StatusCode};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use h2_credit_api::error::ErrorCode;
use h2_credit_api::models::ProductionData;

use common::{number, wallet, TestApp};

#[tokio::test]
async fn test_register_user_lowercases_wallet() -> Result<()> {
    let app = TestApp::spawn().await?;

    let (status, body) = app
        .post(
            "/api/users",
            json!({
                "name": "Nordic Electrolysis",
                "walletAddress": "0xABCDEF0000000000000000000000000000000001",
                "role": "PRODUCER"
            }),
        )
        .await?;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(
        body["data"]["walletAddress"],
        "0xabcdef0000000000000000000000000000000001"
    );
    assert_eq!(number(&body["data"]["totalCredits"]), 0.0);

    let (status, body) = app
        .get("/api/users/wallet/0xAbCdEf0000000000000000000000000000000001")
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Nordic Electrolysis");
    Ok(())
}

#[tokio::test]
async fn test_register_rejects_bad_input() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.register("First", &wallet(1), "BUYER").await?;

    let (status, _) = app
        .post(
            "/api/users",
            json!({ "name": "Second", "walletAddress": wallet(1), "role": "BUYER" }),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post(
            "/api/users",
            json!({ "name": "Bad", "walletAddress": "0x1234", "role": "BUYER" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/users",
            json!({ "name": "Sneaky", "walletAddress": wallet(2), "role": "REGULATORY_AUTHORITY" }),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post("/api/users/connect", json!({ "walletAddress": wallet(9) }))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_submission_requires_producer() -> Result<()> {
    let app = TestApp::spawn().await?;
    let buyer_id = app.register("Buyer", &wallet(2), "BUYER").await?;
    let producer_id = app.register("Producer", &wallet(1), "PRODUCER").await?;

    let production = |producer: &str, quantity: f64| {
        json!({
            "producerId": producer,
            "productionData": { "date": "2024-05-01", "quantity": quantity, "location": "Rotterdam" }
        })
    };

    let (status, _) = app.post("/api/submissions", production(&buyer_id, 500.0)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post("/api/submissions", production(&Uuid::new_v4().to_string(), 500.0))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.post("/api/submissions", production(&producer_id, 0.0)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.post("/api/submissions", production(&producer_id, 500.0)).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "PENDING");
    assert_eq!(number(&body["data"]["credits"]), 0.0);
    assert_eq!(number(&body["data"]["listedCredits"]), 0.0);

    let (status, body) = app
        .get(&format!("/api/submissions?producerId={}&status=PENDING", producer_id))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn test_regulatory_routes_require_authority_token() -> Result<()> {
    let app = TestApp::spawn().await?;

    let (status, _) = app.get("/api/regulatory/stats").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(Method::GET, "/api/regulatory/stats", None, Some("not-a-jwt"))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post(
            "/api/regulatory/login",
            json!({ "email": common::REGULATOR_EMAIL, "password": "wrong password" }),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A well-signed token for a non-regulatory role is refused.
    let producer_id = app.register("Producer", &wallet(1), "PRODUCER").await?;
    let producer = app
        .state
        .user_service
        .get(Uuid::parse_str(&producer_id)?)
        .await?;
    let token = app.state.jwt_service.issue_token(&producer)?;
    let (status, _) = app
        .request(Method::GET, "/api/regulatory/stats", None, Some(&token))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn test_approval_issues_credits_once() -> Result<()> {
    let app = TestApp::spawn().await?;
    let producer_id = app.register("Producer", &wallet(1), "PRODUCER").await?;
    let submission_id = app.submit(&producer_id, 2500.0).await?;
    let token = app.login().await?;

    let (status, body) = app
        .request(Method::GET, "/api/regulatory/submissions/pending", None, Some(&token))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let (status, body) = app
        .post_auth(
            &format!("/api/regulatory/submissions/{}/approve", submission_id),
            json!({}),
            &token,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    let submission = &body["data"];
    assert_eq!(submission["status"], "APPROVED");
    assert_eq!(number(&submission["credits"]), 25.0);
    assert!(submission["reviewedBy"].is_string());
    // Pinata is disabled in tests; the stub contract still hands back a hash.
    assert!(submission["ipfsHash"].is_null());
    let hash = submission["transactionHash"].as_str().unwrap_or_default();
    assert_eq!(hash.len(), 66);
    assert!(hash.starts_with("0x"));

    let credit_id = submission["creditId"].as_str().unwrap_or_default().to_string();
    assert!(credit_id.starts_with("H2C-"));
    assert_eq!(credit_id.len(), 16);

    let (_, body) = app.get(&format!("/api/users/{}", producer_id)).await?;
    assert_eq!(number(&body["data"]["totalCredits"]), 25.0);

    let (status, _) = app
        .post_auth(
            &format!("/api/regulatory/submissions/{}/approve", submission_id),
            json!({}),
            &token,
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = app.get(&format!("/api/users/{}", producer_id)).await?;
    assert_eq!(number(&body["data"]["totalCredits"]), 25.0);

    let (_, body) = app
        .get(&format!("/api/marketplace/transactions?creditId={}", credit_id))
        .await?;
    let ledger = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0]["type"], "GENERATION");
    assert_eq!(ledger[0]["toAddress"], wallet(1));
    Ok(())
}

#[tokio::test]
async fn test_concurrent_approvals_issue_credits_once() -> Result<()> {
    let app = TestApp::spawn().await?;
    let producer_id = app.register("Producer", &wallet(1), "PRODUCER").await?;
    let submission_id = app.submit(&producer_id, 2500.0).await?;
    let token = app.login().await?;
    let uri = format!("/api/regulatory/submissions/{}/approve", submission_id);

    let (first, second) = tokio::join!(
        app.post_auth(&uri, json!({}), &token),
        app.post_auth(&uri, json!({}), &token),
    );
    let mut statuses = vec![first?.0, second?.0];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CONFLICT]);

    let (_, body) = app.get(&format!("/api/users/{}", producer_id)).await?;
    assert_eq!(number(&body["data"]["totalCredits"]), 25.0);

    let (_, body) = app
        .get(&format!("/api/marketplace/transactions?address={}", wallet(1)))
        .await?;
    let generations = body["data"]
        .as_array()
        .map(|txs| txs.iter().filter(|t| t["type"] == "GENERATION").count());
    assert_eq!(generations, Some(1));
    Ok(())
}

#[tokio::test]
async fn test_quantity_too_small_for_any_credit_is_rejected() -> Result<()> {
    let app = TestApp::spawn().await?;
    let producer_id = Uuid::parse_str(&app.register("Producer", &wallet(1), "PRODUCER").await?)?;

    let data = ProductionData {
        date: NaiveDate::from_ymd_opt(2024, 5, 1).context("bad date")?,
        quantity: Decimal::new(1, 28),
        location: "Esbjerg, DK".to_string(),
    };
    let err = app
        .state
        .submission_service
        .create(producer_id, data)
        .await
        .err()
        .context("submission should have been rejected")?;
    assert_eq!(err.error_code(), ErrorCode::InvalidAmount);
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

    let (_, body) = app.get("/api/submissions").await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn test_rejection_records_reason_without_credits() -> Result<()> {
    let app = TestApp::spawn().await?;
    let producer_id = app.register("Producer", &wallet(1), "PRODUCER").await?;
    let submission_id = app.submit(&producer_id, 800.0).await?;
    let token = app.login().await?;
    let uri = format!("/api/regulatory/submissions/{}/reject", submission_id);

    let (status, _) = app.post_auth(&uri, json!({ "reason": "" }), &token).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post_auth(&uri, json!({ "reason": "Meter data incomplete" }), &token)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "REJECTED");
    assert_eq!(body["data"]["rejectionReason"], "Meter data incomplete");
    assert_eq!(number(&body["data"]["credits"]), 0.0);

    let (status, _) = app
        .post_auth(&uri, json!({ "reason": "Again" }), &token)
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post_auth(
            &format!("/api/regulatory/submissions/{}/approve", submission_id),
            json!({}),
            &token,
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn test_credit_views_and_stats() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (producer_id, credit_id) = app.issued_credit(1200.0).await?;

    let (status, body) = app.get("/api/credits").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let (status, body) = app.get(&format!("/api/credits/{}", credit_id)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["creditId"], credit_id.as_str());
    assert_eq!(number(&body["data"]["availableCredits"]), 12.0);
    assert!(body["data"]["metadata"].is_null());

    let (status, _) = app.get("/api/credits/H2C-000000000000").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get(&format!("/api/credits/user/{}", producer_id)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(number(&body["data"]["totalCredits"]), 12.0);
    assert_eq!(body["data"]["issued"].as_array().map(Vec::len), Some(1));

    let token = app.login().await?;
    let (status, body) = app
        .request(Method::GET, "/api/regulatory/stats", None, Some(&token))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["approvedSubmissions"], 1);
    assert_eq!(body["data"]["pendingSubmissions"], 0);
    assert_eq!(number(&body["data"]["totalCreditsIssued"]), 12.0);
    Ok(())
}

#[tokio::test]
async fn test_health_and_openapi() -> Result<()> {
    let app = TestApp::spawn().await?;

    let (status, body) = app.get("/health").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    let deps = body["dependencies"].as_array().cloned().unwrap_or_default();
    assert_eq!(deps[0]["mode"], "file");
    assert_eq!(deps[1]["status"], "degraded");
    assert_eq!(deps[2]["mode"], "stub");

    let (status, body) = app.get("/api/docs/openapi.json").await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/marketplace/listings"].is_object());
    Ok(())
}
