// Marketplace integration tests
// Listing, purchase and cancellation over an approved credit.

mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{id_of, number, wallet, TestApp};

async fn list(app: &TestApp, producer_id: &str, credit_id: &str, credits: f64) -> Result<(StatusCode, Value)> {
    app.post(
        "/api/marketplace/listings",
        json!({
            "producerId": producer_id,
            "creditId": credit_id,
            "credits": credits,
            "pricePerCredit": 2.5
        }),
    )
    .await
}

async fn available(app: &TestApp, credit_id: &str) -> Result<f64> {
    let (_, body) = app.get(&format!("/api/credits/{}", credit_id)).await?;
    Ok(number(&body["data"]["availableCredits"]))
}

async fn total_credits(app: &TestApp, user_id: &str) -> Result<f64> {
    let (_, body) = app.get(&format!("/api/users/{}", user_id)).await?;
    Ok(number(&body["data"]["totalCredits"]))
}

#[tokio::test]
async fn test_listing_is_bounded_by_available_credits() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (producer_id, credit_id) = app.issued_credit(2000.0).await?;

    let (status, body) = list(&app, &producer_id, &credit_id, 25.0).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BIZ_5001");

    let (status, body) = list(&app, &producer_id, &credit_id, 15.0).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "ACTIVE");
    assert_eq!(number(&body["data"]["totalPrice"]), 37.5);
    assert_eq!(available(&app, &credit_id).await?, 5.0);

    let (status, _) = list(&app, &producer_id, &credit_id, 6.0).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = list(&app, &producer_id, &credit_id, 0.0).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_listing_with_unrepresentable_total_keeps_credits_available() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (producer_id, credit_id) = app.issued_credit(1000.0).await?;

    let (status, body) = app
        .post(
            "/api/marketplace/listings",
            json!({
                "producerId": producer_id,
                "creditId": credit_id,
                "credits": 10,
                "pricePerCredit": 1e28
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VAL_3005");

    assert_eq!(available(&app, &credit_id).await?, 10.0);
    let (_, body) = app.get("/api/marketplace/listings").await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));

    let (status, _) = list(&app, &producer_id, &credit_id, 10.0).await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn test_listing_requires_owner_and_known_credit() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (_, credit_id) = app.issued_credit(1000.0).await?;
    let other = app.register("Other producer", &wallet(3), "PRODUCER").await?;
    let buyer = app.register("Buyer", &wallet(2), "BUYER").await?;

    let (status, _) = list(&app, &other, &credit_id, 1.0).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = list(&app, &buyer, &credit_id, 1.0).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = list(&app, &other, "H2C-FFFFFFFFFFFF", 1.0).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_purchase_moves_credits_once() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (producer_id, credit_id) = app.issued_credit(2000.0).await?;
    let buyer_id = app.register("Buyer", &wallet(2), "BUYER").await?;

    let (_, body) = list(&app, &producer_id, &credit_id, 8.0).await?;
    let listing_id = id_of(&body)?;
    let uri = format!("/api/marketplace/listings/{}/purchase", listing_id);

    let (status, _) = app.post(&uri, json!({ "buyerId": producer_id })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.post(&uri, json!({ "buyerId": buyer_id })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "SOLD");
    assert_eq!(body["data"]["buyerId"], buyer_id.as_str());
    assert!(body["data"]["soldAt"].is_string());
    assert!(body["data"]["transactionHash"].is_string());

    assert_eq!(total_credits(&app, &producer_id).await?, 12.0);
    assert_eq!(total_credits(&app, &buyer_id).await?, 8.0);

    let (status, _) = app.post(&uri, json!({ "buyerId": buyer_id })).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(total_credits(&app, &buyer_id).await?, 8.0);

    let (_, body) = app.get(&format!("/api/credits/user/{}", buyer_id)).await?;
    assert_eq!(body["data"]["purchased"].as_array().map(Vec::len), Some(1));

    let (_, body) = app
        .get(&format!("/api/marketplace/transactions?address={}", wallet(2)))
        .await?;
    let ledger = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0]["type"], "PURCHASE");
    assert_eq!(ledger[0]["fromAddress"], wallet(1));
    assert_eq!(number(&ledger[0]["price"]), 20.0);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_purchases_sell_listing_once() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (producer_id, credit_id) = app.issued_credit(2000.0).await?;
    let first_buyer = app.register("First buyer", &wallet(2), "BUYER").await?;
    let second_buyer = app.register("Second buyer", &wallet(3), "BUYER").await?;

    let (_, body) = list(&app, &producer_id, &credit_id, 8.0).await?;
    let uri = format!("/api/marketplace/listings/{}/purchase", id_of(&body)?);

    let (first, second) = tokio::join!(
        app.post(&uri, json!({ "buyerId": first_buyer })),
        app.post(&uri, json!({ "buyerId": second_buyer })),
    );
    let mut statuses = vec![first?.0, second?.0];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CONFLICT]);

    assert_eq!(total_credits(&app, &producer_id).await?, 12.0);
    let bought =
        total_credits(&app, &first_buyer).await? + total_credits(&app, &second_buyer).await?;
    assert_eq!(bought, 8.0);

    let (_, body) = app
        .get(&format!("/api/marketplace/transactions?creditId={}", credit_id))
        .await?;
    let purchases = body["data"]
        .as_array()
        .map(|txs| txs.iter().filter(|t| t["type"] == "PURCHASE").count());
    assert_eq!(purchases, Some(1));
    Ok(())
}

#[tokio::test]
async fn test_cancel_returns_credits() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (producer_id, credit_id) = app.issued_credit(1000.0).await?;
    let other = app.register("Other producer", &wallet(3), "PRODUCER").await?;

    let (_, body) = list(&app, &producer_id, &credit_id, 10.0).await?;
    let listing_id = id_of(&body)?;
    assert_eq!(available(&app, &credit_id).await?, 0.0);

    let uri = format!("/api/marketplace/listings/{}/cancel", listing_id);
    let (status, _) = app.post(&uri, json!({ "producerId": other })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.post(&uri, json!({ "producerId": producer_id })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "CANCELLED");
    assert_eq!(available(&app, &credit_id).await?, 10.0);

    let (status, _) = app.post(&uri, json!({ "producerId": producer_id })).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post(
            &format!("/api/marketplace/listings/{}/purchase", listing_id),
            json!({ "buyerId": other }),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = app
        .get(&format!("/api/marketplace/transactions?creditId={}", credit_id))
        .await?;
    let kinds: Vec<&str> = body["data"]
        .as_array()
        .map(|txs| txs.iter().filter_map(|t| t["type"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(kinds, vec!["DELISTING", "LISTING", "GENERATION"]);
    Ok(())
}

#[tokio::test]
async fn test_listing_filters() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (producer_id, credit_id) = app.issued_credit(3000.0).await?;

    list(&app, &producer_id, &credit_id, 5.0).await?;
    let (_, body) = list(&app, &producer_id, &credit_id, 5.0).await?;
    let cancelled = id_of(&body)?;
    app.post(
        &format!("/api/marketplace/listings/{}/cancel", cancelled),
        json!({ "producerId": producer_id }),
    )
    .await?;

    let (status, body) = app.get("/api/marketplace/listings?status=ACTIVE").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let (_, body) = app
        .get(&format!("/api/marketplace/listings?producerId={}", producer_id))
        .await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));

    let (status, _) = app.get("/api/marketplace/listings?status=EXPIRED").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/api/marketplace/listings/not-a-uuid").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}
