//! Account service - owner-scoped account management

use std::sync::Arc;

use tracing::{info, instrument};

use crate::adapters::duckdb::DuckDbStore;
use crate::config::Config;
use crate::domain::result::{Error, Result};
use crate::domain::{Account, Currency};
use crate::ports::{LedgerStore, TransactionExecutor};
use crate::services::transfer::enforce_overdraft_policy;

const MIN_PAGE_SIZE: i64 = 5;
const MAX_PAGE_SIZE: i64 = 10;

/// Account service
pub struct AccountService {
    store: Arc<DuckDbStore>,
    config: Arc<Config>,
}

impl AccountService {
    pub fn new(store: Arc<DuckDbStore>, config: Arc<Config>) -> Self {
        Self { store, config }
    }

    pub fn create_account(&self, owner: &str, currency: &str) -> Result<Account> {
        let currency: Currency = currency.parse()?;
        let account = self.store.create_account(owner, currency)?;
        info!(account_id = account.id, owner, %currency, "account created");
        Ok(account)
    }

    /// Fetch an account, refusing accounts that belong to someone else
    pub fn get_account(&self, owner: &str, id: i64) -> Result<Account> {
        let account = self.store.get_account(id)?;
        if !account.is_owned_by(owner) {
            return Err(Error::PermissionDenied(format!(
                "account {} doesn't belong to {}",
                id, owner
            )));
        }
        Ok(account)
    }

    /// One page of the owner's accounts, ordered by id
    ///
    /// `page_id` starts at 1; `page_size` must be between 5 and 10.
    pub fn list_accounts(&self, owner: &str, page_id: i64, page_size: i64) -> Result<Vec<Account>> {
        if page_id < 1 {
            return Err(Error::invalid_argument(format!(
                "page_id must be at least 1, got {}",
                page_id
            )));
        }
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(Error::invalid_argument(format!(
                "page_size must be between {} and {}, got {}",
                MIN_PAGE_SIZE, MAX_PAGE_SIZE, page_size
            )));
        }
        self.store
            .list_accounts_by_owner(owner, page_size, (page_id - 1) * page_size)
    }

    pub fn delete_account(&self, owner: &str, id: i64) -> Result<()> {
        self.store.delete_account(id, owner)?;
        info!(account_id = id, owner, "account deleted");
        Ok(())
    }

    /// Add funds to an owned account
    #[instrument(skip(self))]
    pub fn credit(&self, owner: &str, id: i64, amount: i64) -> Result<Account> {
        self.check_amount(amount)?;
        self.get_account(owner, id)?;
        let account = self.store.add_account_balance(id, amount)?;
        info!(balance = account.balance, "account credited");
        Ok(account)
    }

    /// Remove funds from an owned account under the configured overdraft policy
    #[instrument(skip(self))]
    pub fn debit(&self, owner: &str, id: i64, amount: i64) -> Result<Account> {
        self.check_amount(amount)?;
        self.get_account(owner, id)?;

        let policy = self.config.overdraft_policy;
        let account = self.store.run_in_transaction_with_deadline(
            self.config.default_deadline(),
            |q| {
                let account = q.add_account_balance(id, -amount)?;
                enforce_overdraft_policy(policy, &account)?;
                Ok(account)
            },
        )?;
        info!(balance = account.balance, "account debited");
        Ok(account)
    }

    fn check_amount(&self, amount: i64) -> Result<()> {
        if amount <= 0 || amount > self.config.max_adjustment {
            return Err(Error::invalid_argument(format!(
                "amount must be between 1 and {}, got {}",
                self.config.max_adjustment, amount
            )));
        }
        Ok(())
    }
}
