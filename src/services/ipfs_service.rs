//! Pinata client for pinning and reading credit metadata.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::config::PinataConfig;

#[derive(Debug, Error)]
pub enum IpfsError {
    #[error("Pinata credentials are not configured")]
    Disabled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Pinata returned {status}: {body}")]
    Status { status: u16, body: String },
}

pub type IpfsResult<T> = std::result::Result<T, IpfsError>;

/// Response of `pinning/pinJSONToIPFS`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct PinResult {
    #[serde(rename(deserialize = "IpfsHash", serialize = "ipfsHash"))]
    pub ipfs_hash: String,
    #[serde(rename(deserialize = "PinSize", serialize = "pinSize"))]
    pub pin_size: u64,
    #[serde(rename(deserialize = "Timestamp", serialize = "timestamp"))]
    pub timestamp: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PinMetadata {
    pub name: Option<String>,
    #[serde(default)]
    pub keyvalues: Option<HashMap<String, serde_json::Value>>,
}

/// Row of `data/pinList`
#[derive(Debug, Clone, Deserialize)]
pub struct PinRow {
    pub ipfs_pin_hash: String,
    pub date_pinned: DateTime<Utc>,
    #[serde(default)]
    pub size: u64,
    pub metadata: Option<PinMetadata>,
}

#[derive(Debug, Deserialize)]
struct PinListResponse {
    #[serde(default)]
    rows: Vec<PinRow>,
}

#[derive(Clone)]
pub struct IpfsService {
    client: Client,
    config: PinataConfig,
}

impl IpfsService {
    pub fn new(config: PinataConfig, timeout: Duration) -> IpfsResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        if config.is_configured() {
            info!(api = %config.api_url, gateway = %config.gateway_url, "Pinata adapter enabled");
        } else {
            info!("Pinata credentials not set, IPFS pinning disabled");
        }

        Ok(Self { client, config })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_configured()
    }

    pub fn mode(&self) -> &'static str {
        if self.is_enabled() {
            "pinata"
        } else {
            "disabled"
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: RequestBuilder) -> IpfsResult<RequestBuilder> {
        if let Some(jwt) = &self.config.jwt {
            return Ok(request.bearer_auth(jwt));
        }
        match (&self.config.api_key, &self.config.secret_api_key) {
            (Some(key), Some(secret)) => Ok(request
                .header("pinata_api_key", key)
                .header("pinata_secret_api_key", secret)),
            _ => Err(IpfsError::Disabled),
        }
    }

    async fn check(response: reqwest::Response) -> IpfsResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(IpfsError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// Pin a JSON document under `name`, tagged with `keyvalues` for later lookup.
    pub async fn pin_json<T: Serialize + ?Sized>(
        &self,
        name: &str,
        keyvalues: HashMap<String, String>,
        content: &T,
    ) -> IpfsResult<PinResult> {
        let body = json!({
            "pinataContent": content,
            "pinataMetadata": {
                "name": name,
                "keyvalues": keyvalues,
            },
        });

        let request = self.client.post(self.api_url("pinning/pinJSONToIPFS"));
        let response = self.authorize(request)?.json(&body).send().await?;
        let pin: PinResult = Self::check(response).await?.json().await?;

        info!(name, ipfs_hash = %pin.ipfs_hash, size = pin.pin_size, "Pinned JSON to IPFS");
        Ok(pin)
    }

    /// Pins tagged with `creditId`, newest first.
    pub async fn find_pins(&self, credit_id: &str) -> IpfsResult<Vec<PinRow>> {
        let filter = json!({ "creditId": { "value": credit_id, "op": "eq" } }).to_string();

        let request = self
            .client
            .get(self.api_url("data/pinList"))
            .query(&[("status", "pinned"), ("metadata[keyvalues]", filter.as_str())]);
        let response = self.authorize(request)?.send().await?;
        let list: PinListResponse = Self::check(response).await?.json().await?;

        let mut rows = list.rows;
        rows.sort_by(|a, b| b.date_pinned.cmp(&a.date_pinned));
        debug!(credit_id, pins = rows.len(), "Pinata pin list fetched");
        Ok(rows)
    }

    /// Fetch a pinned JSON document through the gateway.
    pub async fn fetch_json(&self, ipfs_hash: &str) -> IpfsResult<serde_json::Value> {
        if !self.is_enabled() {
            return Err(IpfsError::Disabled);
        }
        let url = format!(
            "{}/ipfs/{}",
            self.config.gateway_url.trim_end_matches('/'),
            ipfs_hash
        );
        let response = self.client.get(url).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }
}
