pub mod credits;
pub mod extractors;
pub mod health;
pub mod marketplace;
pub mod metrics;
pub mod regulatory;
pub mod response;
pub mod submissions;
pub mod users;

// Re-export commonly used types
pub use extractors::{ValidatedJson, ValidatedUuid};
pub use response::{ApiResponse, Created};
