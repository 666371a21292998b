//! Core domain entities
//!
//! Pure data structures with validation logic - no I/O.

mod account;
mod currency;
mod entry;
pub mod result;
mod transfer;
mod user;

pub use account::Account;
pub use currency::Currency;
pub use entry::Entry;
pub use transfer::{Transfer, TransferTxParams, TransferTxResult};
pub use user::{NewUser, User};
