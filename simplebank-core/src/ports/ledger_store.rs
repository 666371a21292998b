//! Ledger store port - storage primitives and the transaction executor

use std::time::Instant;

use crate::domain::result::Result;
use crate::domain::{Account, Currency, Entry, NewUser, Transfer, User};

/// Storage primitives over accounts, entries, transfers and users
///
/// Each method is a single atomic storage operation. Nothing here retries;
/// failures propagate unchanged. The same trait is implemented by the
/// auto-commit store handle and by the transaction-scoped handle passed to a
/// unit of work, so engine code cannot tell them apart.
pub trait LedgerStore {
    // === Accounts ===

    fn get_account(&self, id: i64) -> Result<Account>;

    /// Create an account with a zero balance
    fn create_account(&self, owner: &str, currency: Currency) -> Result<Account>;

    fn list_accounts_by_owner(&self, owner: &str, limit: i64, offset: i64)
        -> Result<Vec<Account>>;

    /// Atomically add `delta` (which may be negative) to the stored balance
    /// and return the updated row.
    ///
    /// Does not check for sufficient funds. Two concurrent calls on the same
    /// account always compose: the final balance is the sum of all deltas.
    fn add_account_balance(&self, id: i64, delta: i64) -> Result<Account>;

    /// Delete an account owned by `owner`. Fails with a constraint violation
    /// while any entry or transfer still references it.
    fn delete_account(&self, id: i64, owner: &str) -> Result<()>;

    // === Entries ===

    fn create_entry(&self, account_id: i64, amount: i64) -> Result<Entry>;

    fn get_entry(&self, id: i64) -> Result<Entry>;

    fn list_entries(&self, account_id: i64, limit: i64, offset: i64) -> Result<Vec<Entry>>;

    // === Transfers ===

    fn create_transfer(&self, from_account_id: i64, to_account_id: i64, amount: i64)
        -> Result<Transfer>;

    fn get_transfer(&self, id: i64) -> Result<Transfer>;

    /// Transfers leaving `from_account_id` or arriving at `to_account_id`
    fn list_transfers(
        &self,
        from_account_id: i64,
        to_account_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transfer>>;

    // === Users ===

    fn create_user(&self, user: &NewUser) -> Result<User>;

    fn get_user(&self, username: &str) -> Result<User>;
}

/// Runs a unit of work inside a single database transaction
///
/// The work receives a transaction-scoped [`LedgerStore`]. `Ok` commits,
/// `Err` rolls back and is returned unchanged. The transaction is released
/// on every exit path.
pub trait TransactionExecutor {
    fn run_in_transaction<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&dyn LedgerStore) -> Result<T>,
    {
        self.run_in_transaction_with_deadline(None, work)
    }

    /// Same as [`run_in_transaction`](Self::run_in_transaction), but every
    /// statement and the final commit first check `deadline`; once it has
    /// passed the transaction is rolled back with `Error::DeadlineExceeded`.
    fn run_in_transaction_with_deadline<T, F>(
        &self,
        deadline: Option<Instant>,
        work: F,
    ) -> Result<T>
    where
        F: FnOnce(&dyn LedgerStore) -> Result<T>;
}
