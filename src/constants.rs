//! Application-wide constants.

/// Units of production backing one credit (credits = quantity / divisor).
pub const CREDIT_DIVISOR: u32 = 100;

/// Prefix of issued credit identifiers.
pub const CREDIT_ID_PREFIX: &str = "H2C-";

/// Credit standard recorded in pinned metadata.
pub const CREDIT_STANDARD: &str = "GREEN_HYDROGEN";

/// Decimals used when converting credits and prices to on-chain `uint256` values.
pub const TOKEN_DECIMALS: u32 = 18;

/// Address used as the sender of freshly minted credits when no contract is configured.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// File names of the JSON mirror kept by the file store.
pub mod files {
    pub const USERS: &str = "users.json";
    pub const SUBMISSIONS: &str = "submissions.json";
    pub const MARKETPLACE: &str = "marketplace.json";
    pub const TRANSACTIONS: &str = "transactions.json";
}

/// Metric names.
pub mod metric_names {
    pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
    pub const HTTP_REQUEST_DURATION: &str = "http_request_duration_seconds";
    pub const CREDITS_ISSUED_TOTAL: &str = "credits_issued_total";
    pub const LISTINGS_TOTAL: &str = "marketplace_listings_total";
    pub const PURCHASES_TOTAL: &str = "marketplace_purchases_total";
    pub const EXTERNAL_FAILURES_TOTAL: &str = "external_call_failures_total";
}
