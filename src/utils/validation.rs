use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

static WALLET_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").ok());

/// `0x`-prefixed 20-byte hex address, any case.
pub fn is_valid_wallet(address: &str) -> bool {
    WALLET_RE
        .as_ref()
        .is_some_and(|re| re.is_match(address))
}

/// Canonical stored form of a wallet address.
pub fn normalize_wallet(address: &str) -> String {
    address.trim().to_lowercase()
}

pub fn validate_wallet(address: &str) -> Result<(), ValidationError> {
    if is_valid_wallet(address.trim()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("wallet_address");
        err.message = Some("must be a 0x-prefixed 40 character hex address".into());
        Err(err)
    }
}
