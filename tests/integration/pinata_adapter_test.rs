// Pinata adapter tests against a wiremock server
// Covers request shape, both authentication styles, pin lookup and how
// the credit workflow behaves when Pinata answers or fails.

mod common;

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use h2_credit_api::config::PinataConfig;
use h2_credit_api::services::{IpfsError, IpfsService};

use common::{number, wallet, TestApp};

fn jwt_config(server: &MockServer) -> PinataConfig {
    PinataConfig {
        jwt: Some("pinata-test-jwt".to_string()),
        api_url: server.uri(),
        gateway_url: server.uri(),
        ..PinataConfig::default()
    }
}

fn pin_response(hash: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "IpfsHash": hash,
        "PinSize": 512,
        "Timestamp": "2024-05-01T12:00:00.000Z"
    }))
}

#[tokio::test]
async fn test_pin_json_sends_content_and_metadata() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pinning/pinJSONToIPFS"))
        .and(header("authorization", "Bearer pinata-test-jwt"))
        .and(body_partial_json(json!({
            "pinataContent": { "creditId": "H2C-AAAAAAAAAAAA" },
            "pinataMetadata": {
                "name": "H2C-AAAAAAAAAAAA-issuance",
                "keyvalues": { "creditId": "H2C-AAAAAAAAAAAA" }
            }
        })))
        .respond_with(pin_response("QmIssued"))
        .expect(1)
        .mount(&server)
        .await;

    let ipfs = IpfsService::new(jwt_config(&server), Duration::from_secs(5))?;
    let keyvalues = HashMap::from([("creditId".to_string(), "H2C-AAAAAAAAAAAA".to_string())]);
    let pin = ipfs
        .pin_json(
            "H2C-AAAAAAAAAAAA-issuance",
            keyvalues,
            &json!({ "creditId": "H2C-AAAAAAAAAAAA", "credits": 25 }),
        )
        .await?;

    assert_eq!(pin.ipfs_hash, "QmIssued");
    assert_eq!(pin.pin_size, 512);
    Ok(())
}

#[tokio::test]
async fn test_api_key_pair_headers() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pinning/pinJSONToIPFS"))
        .and(header("pinata_api_key", "key-123"))
        .and(header("pinata_secret_api_key", "secret-456"))
        .respond_with(pin_response("QmKeyed"))
        .expect(1)
        .mount(&server)
        .await;

    let config = PinataConfig {
        api_key: Some("key-123".to_string()),
        secret_api_key: Some("secret-456".to_string()),
        api_url: server.uri(),
        gateway_url: server.uri(),
        ..PinataConfig::default()
    };
    let ipfs = IpfsService::new(config, Duration::from_secs(5))?;
    let pin = ipfs.pin_json("doc", HashMap::new(), &json!({ "a": 1 })).await?;

    assert_eq!(pin.ipfs_hash, "QmKeyed");
    Ok(())
}

#[tokio::test]
async fn test_find_pins_orders_newest_first() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/pinList"))
        .and(query_param("status", "pinned"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 2,
            "rows": [
                {
                    "ipfs_pin_hash": "QmOlder",
                    "date_pinned": "2024-05-01T10:00:00.000Z",
                    "size": 100,
                    "metadata": { "name": "H2C-AAAAAAAAAAAA-issuance", "keyvalues": { "creditId": "H2C-AAAAAAAAAAAA" } }
                },
                {
                    "ipfs_pin_hash": "QmNewer",
                    "date_pinned": "2024-06-01T10:00:00.000Z",
                    "size": 120,
                    "metadata": { "name": "H2C-AAAAAAAAAAAA-transfer", "keyvalues": { "creditId": "H2C-AAAAAAAAAAAA" } }
                }
            ]
        })))
        .mount(&server)
        .await;

    let ipfs = IpfsService::new(jwt_config(&server), Duration::from_secs(5))?;
    let pins = ipfs.find_pins("H2C-AAAAAAAAAAAA").await?;

    let hashes: Vec<&str> = pins.iter().map(|p| p.ipfs_pin_hash.as_str()).collect();
    assert_eq!(hashes, vec!["QmNewer", "QmOlder"]);
    Ok(())
}

#[tokio::test]
async fn test_error_status_is_reported() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pinning/pinJSONToIPFS"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .mount(&server)
        .await;

    let ipfs = IpfsService::new(jwt_config(&server), Duration::from_secs(5))?;
    let result = ipfs.pin_json("doc", HashMap::new(), &json!({})).await;

    match result {
        Err(IpfsError::Status { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid key");
        }
        other => panic!("expected status error, got {:?}", other.map(|p| p.ipfs_hash)),
    }
    Ok(())
}

#[tokio::test]
async fn test_client_timeout_is_applied() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pinning/pinJSONToIPFS"))
        .respond_with(pin_response("QmSlow").set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let ipfs = IpfsService::new(jwt_config(&server), Duration::from_millis(200))?;
    let result = ipfs.pin_json("doc", HashMap::new(), &json!({})).await;

    match result {
        Err(IpfsError::Http(e)) => assert!(e.is_timeout()),
        other => panic!("expected timeout, got {:?}", other.map(|p| p.ipfs_hash)),
    }
    Ok(())
}

#[tokio::test]
async fn test_approval_pins_metadata_and_serves_it() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pinning/pinJSONToIPFS"))
        .respond_with(pin_response("QmCreditDoc"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ipfs/QmCreditDoc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "standard": "GREEN_HYDROGEN",
            "credits": 25
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/pinList"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "rows": [{
                "ipfs_pin_hash": "QmCreditDoc",
                "date_pinned": "2024-05-01T10:00:00.000Z",
                "size": 300
            }]
        })))
        .mount(&server)
        .await;

    let app = TestApp::with_pinata(jwt_config(&server)).await?;
    let (_, credit_id) = app.issued_credit(2500.0).await?;

    let (status, body) = app.get(&format!("/api/credits/{}", credit_id)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ipfsHash"], "QmCreditDoc");
    assert_eq!(body["data"]["metadata"]["standard"], "GREEN_HYDROGEN");

    let (status, body) = app.get(&format!("/api/credits/{}/metadata", credit_id)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ipfsHash"], "QmCreditDoc");
    assert_eq!(number(&body["data"]["content"]["credits"]), 25.0);

    let (_, body) = app.get("/health").await?;
    assert_eq!(body["dependencies"][1]["mode"], "pinata");
    assert_eq!(body["dependencies"][1]["status"], "healthy");
    Ok(())
}

#[tokio::test]
async fn test_pinata_failure_does_not_block_approval() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pinning/pinJSONToIPFS"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/pinList"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 0, "rows": [] })))
        .mount(&server)
        .await;

    let app = TestApp::with_pinata(jwt_config(&server)).await?;
    let producer_id = app.register("Producer", &wallet(1), "PRODUCER").await?;
    let submission_id = app.submit(&producer_id, 1000.0).await?;
    let token = app.login().await?;
    let credit_id = app.approve(&submission_id, &token).await?;

    let (status, body) = app.get(&format!("/api/submissions/{}", submission_id)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "APPROVED");
    assert!(body["data"]["ipfsHash"].is_null());
    assert!(body["data"]["transactionHash"].is_string());

    let (status, _) = app.get(&format!("/api/credits/{}/metadata", credit_id)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_metadata_lookup_without_pinata() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (_, credit_id) = app.issued_credit(1000.0).await?;

    let (status, body) = app.get(&format!("/api/credits/{}/metadata", credit_id)).await?;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"]["message"].is_string());
    Ok(())
}

#[tokio::test]
async fn test_purchase_pins_transfer_record() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pinning/pinJSONToIPFS"))
        .and(body_partial_json(json!({
            "pinataMetadata": { "keyvalues": { "type": "issuance" } }
        })))
        .respond_with(pin_response("QmIssuance"))
        .expect(1)
        .mount(&server)
        .await;

    let app = TestApp::with_pinata(jwt_config(&server)).await?;
    let (producer_id, credit_id) = app.issued_credit(2000.0).await?;
    let buyer_id = app.register("Buyer", &wallet(2), "BUYER").await?;

    Mock::given(method("POST"))
        .and(path("/pinning/pinJSONToIPFS"))
        .and(body_partial_json(json!({
            "pinataContent": {
                "creditId": credit_id,
                "owner": { "id": buyer_id, "walletAddress": wallet(2) },
                "transfer": {
                    "from": { "id": producer_id },
                    "to": { "id": buyer_id },
                    "credits": 4.0
                }
            },
            "pinataMetadata": {
                "name": format!("{}-transfer", credit_id),
                "keyvalues": { "creditId": credit_id, "type": "transfer" }
            }
        })))
        .respond_with(pin_response("QmTransfer"))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = app
        .post(
            "/api/marketplace/listings",
            json!({
                "producerId": producer_id,
                "creditId": credit_id,
                "credits": 4,
                "pricePerCredit": 5
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let listing_id = common::id_of(&body)?;

    let (status, _) = app
        .post(
            &format!("/api/marketplace/listings/{}/purchase", listing_id),
            json!({ "buyerId": buyer_id }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    server.verify().await;
    Ok(())
}
