//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and the ledger store. Each service
//! focuses on one feature area.

mod account;
pub mod migration;
pub mod retry;
mod status;
pub mod transfer;
mod user;

pub use account::AccountService;
pub use migration::{MigrationResult, MigrationService};
pub use retry::{with_retry, with_retry_using, RetryPolicy};
pub use status::{BalanceTotal, IntegrityReport, StatusService, StatusSummary};
pub use transfer::{apply_in_id_order, TransferService};
pub use user::{check_password, hash_password, CreateUserRequest, UserService};
