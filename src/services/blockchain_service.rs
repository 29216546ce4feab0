//! Client for the hydrogen credit ledger contract.
//!
//! With a contract address and signing key configured every call is sent as a
//! transaction through the configured JSON-RPC endpoint and resolves to the mined
//! transaction hash. Without them the service runs in stub mode and returns random
//! 32-byte hashes so the rest of the workflow can be exercised locally.

use std::str::FromStr;
use std::sync::Arc;

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EthereumConfig;
use crate::constants::{TOKEN_DECIMALS, ZERO_ADDRESS};

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    #[derive(Debug)]
    contract HydrogenCreditLedger {
        function generateCredits(address producer, uint256 amount, string metadataUri) external returns (uint256);
        function transferCredits(address from, address to, uint256 amount) external;
        function listCreditsForSale(uint256 amount, uint256 pricePerCredit) external returns (uint256);
        function purchaseCredits(uint256 listingId, uint256 amount) external payable;
    }
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),
}

pub type ChainResult<T> = std::result::Result<T, ChainError>;

/// Convert a decimal amount to its 18-decimal `uint256` representation.
///
/// Digits beyond the 18th decimal place are rounded away.
pub fn to_token_units(value: Decimal) -> ChainResult<U256> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ChainError::InvalidAmount(format!(
            "{} is negative",
            value
        )));
    }
    let rounded = value.round_dp(TOKEN_DECIMALS);
    let mantissa = U256::from(rounded.mantissa().unsigned_abs());
    let factor = U256::from(10u64).pow(U256::from(TOKEN_DECIMALS - rounded.scale()));
    Ok(mantissa * factor)
}

/// On-chain reference of a marketplace listing
pub fn listing_ref(listing_id: Uuid) -> U256 {
    U256::from(listing_id.as_u128())
}

fn parse_address(address: &str) -> ChainResult<Address> {
    Address::from_str(address).map_err(|e| ChainError::InvalidAddress(format!("{}: {}", address, e)))
}

fn format_tx_hash(hash: TxHash) -> String {
    format!("0x{:x}", hash)
}

/// Random `0x`-prefixed 32-byte hash used in stub mode
pub fn stub_tx_hash() -> String {
    let bytes: [u8; 32] = rand::random();
    format!("0x{}", hex::encode(bytes))
}

struct LiveClient {
    contract_address: Address,
    signer: PrivateKeySigner,
    rpc_url: String,
}

impl LiveClient {
    fn provider(&self) -> ChainResult<impl Provider> {
        let rpc_url = self
            .rpc_url
            .parse()
            .map_err(|e| ChainError::Provider(format!("Invalid RPC URL: {}", e)))?;
        let wallet = EthereumWallet::from(self.signer.clone());
        Ok(ProviderBuilder::new().wallet(wallet).connect_http(rpc_url))
    }
}

#[derive(Clone)]
pub struct BlockchainService {
    live: Option<Arc<LiveClient>>,
    chain_id: u64,
}

impl BlockchainService {
    pub fn new(config: &EthereumConfig) -> ChainResult<Self> {
        let (Some(address), Some(private_key)) =
            (config.contract_address.as_deref(), config.private_key.as_deref())
        else {
            warn!(
                "CREDIT_CONTRACT_ADDRESS or ETHEREUM_PRIVATE_KEY not set, blockchain calls run in stub mode"
            );
            return Ok(Self::stub());
        };

        let contract_address = Address::from_str(address).map_err(|e| {
            ChainError::Configuration(format!("Invalid contract address '{}': {}", address, e))
        })?;
        let signer = private_key
            .parse::<PrivateKeySigner>()
            .map_err(|e| ChainError::Configuration(format!("Invalid private key: {}", e)))?;
        config
            .rpc_url
            .parse::<reqwest::Url>()
            .map_err(|e| ChainError::Configuration(format!("Invalid RPC URL: {}", e)))?;

        info!(
            contract = %contract_address,
            signer = %signer.address(),
            chain_id = config.chain_id,
            "Blockchain service connected to credit contract"
        );

        Ok(Self {
            live: Some(Arc::new(LiveClient {
                contract_address,
                signer,
                rpc_url: config.rpc_url.clone(),
            })),
            chain_id: config.chain_id,
        })
    }

    /// Service that never touches a chain.
    pub fn stub() -> Self {
        Self {
            live: None,
            chain_id: EthereumConfig::default().chain_id,
        }
    }

    pub fn is_stub(&self) -> bool {
        self.live.is_none()
    }

    pub fn mode(&self) -> &'static str {
        if self.is_stub() {
            "stub"
        } else {
            "live"
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Contract address, or the zero address in stub mode.
    pub fn contract_address(&self) -> String {
        match &self.live {
            Some(client) => format!("0x{:x}", client.contract_address),
            None => ZERO_ADDRESS.to_string(),
        }
    }

    /// Mint `credits` to the producer's wallet.
    pub async fn generate_credits(
        &self,
        producer: &str,
        credits: Decimal,
        metadata_uri: &str,
    ) -> ChainResult<String> {
        let producer = parse_address(producer)?;
        let amount = to_token_units(credits)?;

        let Some(client) = &self.live else {
            let hash = stub_tx_hash();
            debug!(%producer, %credits, %hash, "Stub generateCredits");
            return Ok(hash);
        };

        let provider = client.provider()?;
        let contract = HydrogenCreditLedger::new(client.contract_address, &provider);
        let receipt = contract
            .generateCredits(producer, amount, metadata_uri.to_string())
            .send()
            .await
            .map_err(|e| ChainError::Transaction(e.to_string()))?
            .get_receipt()
            .await
            .map_err(|e| ChainError::Transaction(e.to_string()))?;

        let hash = format_tx_hash(receipt.transaction_hash);
        info!(%producer, %credits, %hash, "generateCredits mined");
        Ok(hash)
    }

    pub async fn transfer_credits(
        &self,
        from: &str,
        to: &str,
        credits: Decimal,
    ) -> ChainResult<String> {
        let from = parse_address(from)?;
        let to = parse_address(to)?;
        let amount = to_token_units(credits)?;

        let Some(client) = &self.live else {
            let hash = stub_tx_hash();
            debug!(%from, %to, %credits, %hash, "Stub transferCredits");
            return Ok(hash);
        };

        let provider = client.provider()?;
        let contract = HydrogenCreditLedger::new(client.contract_address, &provider);
        let receipt = contract
            .transferCredits(from, to, amount)
            .send()
            .await
            .map_err(|e| ChainError::Transaction(e.to_string()))?
            .get_receipt()
            .await
            .map_err(|e| ChainError::Transaction(e.to_string()))?;

        let hash = format_tx_hash(receipt.transaction_hash);
        info!(%from, %to, %credits, %hash, "transferCredits mined");
        Ok(hash)
    }

    pub async fn list_credits_for_sale(
        &self,
        credits: Decimal,
        price_per_credit: Decimal,
    ) -> ChainResult<String> {
        let amount = to_token_units(credits)?;
        let price = to_token_units(price_per_credit)?;

        let Some(client) = &self.live else {
            let hash = stub_tx_hash();
            debug!(%credits, %price_per_credit, %hash, "Stub listCreditsForSale");
            return Ok(hash);
        };

        let provider = client.provider()?;
        let contract = HydrogenCreditLedger::new(client.contract_address, &provider);
        let receipt = contract
            .listCreditsForSale(amount, price)
            .send()
            .await
            .map_err(|e| ChainError::Transaction(e.to_string()))?
            .get_receipt()
            .await
            .map_err(|e| ChainError::Transaction(e.to_string()))?;

        let hash = format_tx_hash(receipt.transaction_hash);
        info!(%credits, %price_per_credit, %hash, "listCreditsForSale mined");
        Ok(hash)
    }

    /// Payable purchase; `total_price` is sent as the transaction value.
    pub async fn purchase_credits(
        &self,
        listing_id: Uuid,
        credits: Decimal,
        total_price: Decimal,
    ) -> ChainResult<String> {
        let amount = to_token_units(credits)?;
        let value = to_token_units(total_price)?;

        let Some(client) = &self.live else {
            let hash = stub_tx_hash();
            debug!(%listing_id, %credits, %total_price, %hash, "Stub purchaseCredits");
            return Ok(hash);
        };

        let provider = client.provider()?;
        let contract = HydrogenCreditLedger::new(client.contract_address, &provider);
        let receipt = contract
            .purchaseCredits(listing_ref(listing_id), amount)
            .value(value)
            .send()
            .await
            .map_err(|e| ChainError::Transaction(e.to_string()))?
            .get_receipt()
            .await
            .map_err(|e| ChainError::Transaction(e.to_string()))?;

        let hash = format_tx_hash(receipt.transaction_hash);
        info!(%listing_id, %credits, %hash, "purchaseCredits mined");
        Ok(hash)
    }
}
