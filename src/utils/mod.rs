// Request helpers and input validation

pub mod request_info;
pub mod validation;

pub use request_info::{client_ip, user_agent};
pub use validation::{is_valid_wallet, normalize_wallet, validate_wallet};
