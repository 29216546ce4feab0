//! Shared harness for the integration tests: a full router over a temporary
//! file store, the stub contract adapter and a disabled (or mocked) Pinata.
#![allow(dead_code)]

use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use h2_credit_api::config::{
    Config, EthereumConfig, LogFormat, PinataConfig, RegulatoryConfig, StoreBackend, StoreConfig,
};
use h2_credit_api::database::{FileStore, SharedStore};
use h2_credit_api::services::{BlockchainService, IpfsService};
use h2_credit_api::{build_router, startup, AppState};

pub const REGULATOR_EMAIL: &str = "regulator@test.local";
pub const REGULATOR_PASSWORD: &str = "correct horse battery staple";

pub fn test_config(data_dir: &std::path::Path, pinata: PinataConfig) -> Config {
    Config {
        environment: "test".to_string(),
        port: 0,
        request_timeout: 5,
        log_format: LogFormat::Pretty,
        jwt_secret: "integration-test-secret".to_string(),
        jwt_expiration: 3600,
        store: StoreConfig {
            backend: StoreBackend::File,
            data_dir: data_dir.to_path_buf(),
            database_url: None,
            max_connections: 1,
        },
        regulatory: RegulatoryConfig {
            name: "Test Regulator".to_string(),
            email: REGULATOR_EMAIL.to_string(),
            password: REGULATOR_PASSWORD.to_string(),
        },
        pinata,
        ethereum: EthereumConfig::default(),
    }
}

/// Deterministic, distinct wallet per seed.
pub fn wallet(seed: u8) -> String {
    format!("0x{:040x}", seed as u64 + 1)
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub data_dir: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Result<Self> {
        Self::with_pinata(PinataConfig::default()).await
    }

    pub async fn with_pinata(pinata: PinataConfig) -> Result<Self> {
        let data_dir = tempfile::tempdir()?;
        let config = test_config(data_dir.path(), pinata.clone());
        let store: SharedStore = std::sync::Arc::new(FileStore::open(data_dir.path()).await?);
        let ipfs = IpfsService::new(pinata, Duration::from_secs(5))?;
        let state =
            startup::build_state(config, store, ipfs, BlockchainService::stub(), None).await?;

        Ok(Self {
            router: build_router(state.clone()),
            state,
            data_dir,
        })
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Ok((status, value))
    }

    pub async fn get(&self, uri: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::GET, uri, None, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::POST, uri, Some(body), None).await
    }

    pub async fn post_auth(&self, uri: &str, body: Value, token: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::POST, uri, Some(body), Some(token)).await
    }

    /// Register a user and return its id.
    pub async fn register(&self, name: &str, wallet: &str, role: &str) -> Result<String> {
        let (status, body) = self
            .post(
                "/api/users",
                json!({ "name": name, "walletAddress": wallet, "role": role }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "register failed: {} {}", status, body);
        id_of(&body)
    }

    pub async fn login(&self) -> Result<String> {
        let (status, body) = self
            .post(
                "/api/regulatory/login",
                json!({ "email": REGULATOR_EMAIL, "password": REGULATOR_PASSWORD }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "login failed: {} {}", status, body);
        body["data"]["accessToken"]
            .as_str()
            .map(str::to_string)
            .context("missing accessToken")
    }

    /// Submit production and return the submission id.
    pub async fn submit(&self, producer_id: &str, quantity: f64) -> Result<String> {
        let (status, body) = self
            .post(
                "/api/submissions",
                json!({
                    "producerId": producer_id,
                    "productionData": {
                        "date": "2024-05-01",
                        "quantity": quantity,
                        "location": "Esbjerg, DK"
                    }
                }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "submit failed: {} {}", status, body);
        id_of(&body)
    }

    /// Approve a submission and return its credit id.
    pub async fn approve(&self, submission_id: &str, token: &str) -> Result<String> {
        let (status, body) = self
            .post_auth(
                &format!("/api/regulatory/submissions/{}/approve", submission_id),
                json!({}),
                token,
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "approve failed: {} {}", status, body);
        body["data"]["creditId"]
            .as_str()
            .map(str::to_string)
            .context("missing creditId")
    }

    /// Producer with an approved credit of `quantity / 100` credits.
    pub async fn issued_credit(&self, quantity: f64) -> Result<(String, String)> {
        let producer_id = self.register("Producer", &wallet(1), "PRODUCER").await?;
        let submission_id = self.submit(&producer_id, quantity).await?;
        let token = self.login().await?;
        let credit_id = self.approve(&submission_id, &token).await?;
        Ok((producer_id, credit_id))
    }
}

pub fn id_of(body: &Value) -> Result<String> {
    body["data"]["id"]
        .as_str()
        .map(str::to_string)
        .context("response has no data.id")
}

pub fn number(value: &Value) -> f64 {
    value.as_f64().unwrap_or(f64::NAN)
}
