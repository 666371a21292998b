//! Status service - ledger summary and integrity audit

use std::sync::Arc;

use serde::Serialize;

use crate::adapters::duckdb::{CurrencyTotal, DuckDbStore};
use crate::domain::result::Result;
use crate::domain::Currency;

/// Status service for ledger summaries
pub struct StatusService {
    store: Arc<DuckDbStore>,
}

impl StatusService {
    pub fn new(store: Arc<DuckDbStore>) -> Self {
        Self { store }
    }

    /// Get overall status summary
    pub fn summary(&self) -> Result<StatusSummary> {
        let counts = self.store.get_counts()?;
        let totals = self.store.get_balance_totals()?;

        Ok(StatusSummary {
            total_users: counts.users,
            total_accounts: counts.accounts,
            total_transfers: counts.transfers,
            total_entries: counts.entries,
            balances: totals.into_iter().map(BalanceTotal::from).collect(),
        })
    }

    /// Check the double-entry invariants over the whole ledger
    pub fn verify_integrity(&self) -> Result<IntegrityReport> {
        let counts = self.store.get_counts()?;
        Ok(IntegrityReport {
            entry_sum: self.store.sum_entries()?,
            entry_count: counts.entries,
            transfer_count: counts.transfers,
            orphaned_entries: self.store.check_orphaned_entries()?,
            mismatched_accounts: self.store.check_entry_transfer_mismatches()?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub total_users: i64,
    pub total_accounts: i64,
    pub total_transfers: i64,
    pub total_entries: i64,
    pub balances: Vec<BalanceTotal>,
}

#[derive(Debug, Serialize)]
pub struct BalanceTotal {
    pub currency: Currency,
    pub accounts: i64,
    /// Minor units
    pub total_balance: i64,
}

impl From<CurrencyTotal> for BalanceTotal {
    fn from(total: CurrencyTotal) -> Self {
        Self {
            currency: total.currency,
            accounts: total.accounts,
            total_balance: total.total_balance,
        }
    }
}

/// Result of [`StatusService::verify_integrity`]
#[derive(Debug, Serialize)]
pub struct IntegrityReport {
    /// Sum of all entry amounts
    pub entry_sum: i64,
    pub entry_count: i64,
    pub transfer_count: i64,
    /// Entries pointing at accounts that no longer exist
    pub orphaned_entries: Vec<i64>,
    /// Accounts whose entries disagree with their transfers
    pub mismatched_accounts: Vec<i64>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.entry_sum == 0
            && self.entry_count == 2 * self.transfer_count
            && self.orphaned_entries.is_empty()
            && self.mismatched_accounts.is_empty()
    }
}
