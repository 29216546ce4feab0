// Data models and DTOs
// Stored records plus the derived credit views returned by the API.

pub mod credit;
pub mod listing;
pub mod submission;
pub mod transaction;
pub mod user;

pub use credit::{Credit, CreditMetadata, CreditOwner, TransferRecord};
pub use listing::{ListingStatus, MarketplaceListing};
pub use submission::{ProductionData, Submission, SubmissionStatus};
pub use transaction::{Transaction, TransactionType};
pub use user::{User, UserResponse, UserRole};
