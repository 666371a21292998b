//! Account domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Currency;

/// An account holding a balance in a single currency
///
/// `balance` is never written directly; it only moves through
/// `LedgerStore::add_account_balance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub owner: String,
    /// Balance in minor currency units
    pub balance: i64,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn is_owned_by(&self, username: &str) -> bool {
        self.owner == username
    }

    pub fn is_overdrawn(&self) -> bool {
        self.balance < 0
    }
}
