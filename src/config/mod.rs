use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub environment: String,
    pub port: u16,
    pub request_timeout: u64,
    pub log_format: LogFormat,
    pub jwt_secret: String,
    pub jwt_expiration: i64,
    pub store: StoreConfig,
    pub regulatory: RegulatoryConfig,
    pub pinata: PinataConfig,
    pub ethereum: EthereumConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    File,
    Postgres,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "file" | "json" => Ok(Self::File),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(anyhow::anyhow!("Unknown STORE_BACKEND: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub data_dir: PathBuf,
    pub database_url: Option<String>,
    pub max_connections: u32,
}

/// Account seeded at startup for the regulatory authority
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegulatoryConfig {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinataConfig {
    pub jwt: Option<String>,
    pub api_key: Option<String>,
    pub secret_api_key: Option<String>,
    pub api_url: String,
    pub gateway_url: String,
}

impl PinataConfig {
    pub fn is_configured(&self) -> bool {
        self.jwt.is_some() || (self.api_key.is_some() && self.secret_api_key.is_some())
    }
}

impl Default for PinataConfig {
    fn default() -> Self {
        Self {
            jwt: None,
            api_key: None,
            secret_api_key: None,
            api_url: "https://api.pinata.cloud".to_string(),
            gateway_url: "https://gateway.pinata.cloud".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EthereumConfig {
    pub rpc_url: String,
    pub contract_address: Option<String>,
    pub private_key: Option<String>,
    pub chain_id: u64,
}

impl EthereumConfig {
    /// Contract calls go on chain only with both an address and a signing key.
    pub fn is_live(&self) -> bool {
        self.contract_address.is_some() && self.private_key.is_some()
    }
}

impl Default for EthereumConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            contract_address: None,
            private_key: None,
            chain_id: 31337,
        }
    }
}

// Unset and blank variables are treated the same.
fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required(key: &str) -> Result<String> {
    optional(key).ok_or_else(|| anyhow::anyhow!("{} environment variable is required", key))
}

fn or_default(key: &str, default: &str) -> String {
    optional(key).unwrap_or_else(|| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let backend: StoreBackend = or_default("STORE_BACKEND", "file").parse()?;
        let database_url = optional("DATABASE_URL");
        if backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(anyhow::anyhow!(
                "DATABASE_URL environment variable is required when STORE_BACKEND=postgres"
            ));
        }

        let pinata_defaults = PinataConfig::default();
        let ethereum_defaults = EthereumConfig::default();

        Ok(Config {
            environment: or_default("ENVIRONMENT", "development"),
            port: or_default("PORT", "5000")
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid PORT: {}", e))?,
            request_timeout: or_default("REQUEST_TIMEOUT", "30").parse().unwrap_or(30),
            log_format: match optional("LOG_FORMAT").as_deref() {
                Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiration: or_default("JWT_EXPIRATION", "86400")
                .parse()
                .unwrap_or(86400),
            store: StoreConfig {
                backend,
                data_dir: PathBuf::from(or_default("DATA_DIR", "data")),
                database_url,
                max_connections: or_default("MAX_CONNECTIONS", "10").parse().unwrap_or(10),
            },
            regulatory: RegulatoryConfig {
                name: or_default("REGULATORY_NAME", "Regulatory Authority"),
                email: or_default("REGULATORY_EMAIL", "regulator@h2credits.local"),
                password: required("REGULATORY_PASSWORD")?,
            },
            pinata: PinataConfig {
                jwt: optional("PINATA_JWT"),
                api_key: optional("PINATA_API_KEY"),
                secret_api_key: optional("PINATA_SECRET_API_KEY"),
                api_url: optional("PINATA_API_URL").unwrap_or(pinata_defaults.api_url),
                gateway_url: optional("PINATA_GATEWAY_URL").unwrap_or(pinata_defaults.gateway_url),
            },
            ethereum: EthereumConfig {
                rpc_url: optional("ETHEREUM_RPC_URL").unwrap_or(ethereum_defaults.rpc_url),
                contract_address: optional("CREDIT_CONTRACT_ADDRESS"),
                private_key: optional("ETHEREUM_PRIVATE_KEY"),
                chain_id: optional("CHAIN_ID")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(ethereum_defaults.chain_id),
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}
