// File store persistence tests
// Records written through the API are read back identically after the
// store is reopened, and credit derivation holds for arbitrary quantities.

mod common;

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use axum::http::StatusCode;
use proptest::prelude::*;
use rust_decimal::Decimal;
use serde_json::json;

use h2_credit_api::config::PinataConfig;
use h2_credit_api::database::{
    FileStore, ListingFilter, SharedStore, Store, SubmissionFilter, TransactionFilter,
};
use h2_credit_api::models::credit::credits_for_quantity;
use h2_credit_api::models::UserRole;
use h2_credit_api::services::{BlockchainService, IpfsService};
use h2_credit_api::startup;

use common::{id_of, test_config, wallet, TestApp};

#[tokio::test]
async fn test_records_survive_restart() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (producer_id, credit_id) = app.issued_credit(1500.0).await?;
    let buyer_id = app.register("Buyer", &wallet(2), "BUYER").await?;

    let (status, body) = app
        .post(
            "/api/marketplace/listings",
            json!({
                "producerId": producer_id,
                "creditId": credit_id,
                "credits": 5,
                "pricePerCredit": 3
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let listing_id = id_of(&body)?;
    let (status, _) = app
        .post(
            &format!("/api/marketplace/listings/{}/purchase", listing_id),
            json!({ "buyerId": buyer_id }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let store = app.state.store.clone();
    let users = store.list_users(None).await?;
    let submissions = store.list_submissions(&SubmissionFilter::default()).await?;
    let listings = store.list_listings(&ListingFilter::default()).await?;
    let transactions = store.list_transactions(&TransactionFilter::default()).await?;
    assert_eq!(users.len(), 3);
    assert_eq!(transactions.len(), 3);

    let TestApp {
        router,
        state,
        data_dir,
    } = app;
    drop(router);
    drop(state);
    drop(store);

    let reopened = FileStore::open(data_dir.path()).await?;
    assert_eq!(reopened.list_users(None).await?, users);
    assert_eq!(
        reopened.list_submissions(&SubmissionFilter::default()).await?,
        submissions
    );
    assert_eq!(reopened.list_listings(&ListingFilter::default()).await?, listings);
    assert_eq!(
        reopened.list_transactions(&TransactionFilter::default()).await?,
        transactions
    );

    let buyer = reopened
        .get_user(uuid::Uuid::parse_str(&buyer_id)?)
        .await?
        .ok_or_else(|| anyhow::anyhow!("buyer missing after reload"))?;
    assert_eq!(buyer.total_credits, Decimal::from(5));
    Ok(())
}

#[tokio::test]
async fn test_restart_does_not_reseed_regulator() -> Result<()> {
    let data_dir = tempfile::tempdir()?;

    for _ in 0..2 {
        let store: SharedStore = Arc::new(FileStore::open(data_dir.path()).await?);
        startup::build_state(
            test_config(data_dir.path(), PinataConfig::default()),
            store,
            IpfsService::new(PinataConfig::default(), std::time::Duration::from_secs(1))?,
            BlockchainService::stub(),
            None,
        )
        .await?;
    }

    let store = FileStore::open(data_dir.path()).await?;
    let authorities = store
        .list_users(Some(UserRole::RegulatoryAuthority))
        .await?;
    assert_eq!(authorities.len(), 1);
    assert_eq!(authorities[0].email.as_deref(), Some(common::REGULATOR_EMAIL));
    Ok(())
}

#[tokio::test]
async fn test_corrupt_data_file_fails_startup() -> Result<()> {
    let data_dir = tempfile::tempdir()?;
    tokio::fs::write(data_dir.path().join("submissions.json"), b"{ not json").await?;

    assert!(FileStore::open(data_dir.path()).await.is_err());
    Ok(())
}

proptest! {
    #[test]
    fn credits_are_exactly_one_hundredth(cents in 1i64..1_000_000_000i64) {
        let quantity = Decimal::new(cents, 2);
        let credits = credits_for_quantity(quantity);

        prop_assert!(credits > Decimal::ZERO);
        prop_assert_eq!(credits * Decimal::from(100), quantity);
    }

    #[test]
    fn credits_follow_quantity_order(a in 1u32..5_000_000u32, b in 1u32..5_000_000u32) {
        let (qa, qb) = (Decimal::from(a), Decimal::from(b));
        prop_assert_eq!(
            qa.cmp(&qb),
            credits_for_quantity(qa).cmp(&credits_for_quantity(qb))
        );
    }
}

#[test]
fn test_known_credit_amounts() {
    let cases = [("2500", "25"), ("150", "1.5"), ("1", "0.01")];
    for (quantity, expected) in cases {
        let quantity = Decimal::from_str(quantity).unwrap();
        assert_eq!(credits_for_quantity(quantity), Decimal::from_str(expected).unwrap());
    }
}
