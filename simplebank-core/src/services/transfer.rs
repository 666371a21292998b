//! Transfer service - moves funds between accounts atomically
//!
//! A transfer writes one `transfers` row, two `entries` rows and two balance
//! updates inside a single transaction. Balance updates always happen in
//! ascending account id order, so two transfers touching the same pair of
//! accounts lock (or conflict on) the rows in the same sequence.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument};

use crate::adapters::duckdb::DuckDbStore;
use crate::config::{Config, OverdraftPolicy};
use crate::domain::result::{Error, Result};
use crate::domain::{Account, Currency, Entry, Transfer, TransferTxParams, TransferTxResult};
use crate::ports::{LedgerStore, TransactionExecutor};

/// Apply balance deltas in ascending account id order
///
/// Returns the updated accounts in the order the adjustments were given.
pub fn apply_in_id_order(store: &dyn LedgerStore, adjustments: &[(i64, i64)]) -> Result<Vec<Account>> {
    let mut order: Vec<usize> = (0..adjustments.len()).collect();
    order.sort_by_key(|&i| adjustments[i].0);

    let mut updated = Vec::with_capacity(adjustments.len());
    for i in order {
        let (account_id, delta) = adjustments[i];
        updated.push((i, store.add_account_balance(account_id, delta)?));
    }
    updated.sort_by_key(|(i, _)| *i);
    Ok(updated.into_iter().map(|(_, account)| account).collect())
}

/// Reject a post-update balance that went negative, when the policy says so
pub fn enforce_overdraft_policy(policy: OverdraftPolicy, account: &Account) -> Result<()> {
    if policy == OverdraftPolicy::Reject && account.is_overdrawn() {
        return Err(Error::InsufficientFunds {
            account_id: account.id,
            balance: account.balance,
        });
    }
    Ok(())
}

/// The body of a transfer, run against a transaction-scoped store
pub fn execute_transfer(
    store: &dyn LedgerStore,
    params: &TransferTxParams,
    overdraft: OverdraftPolicy,
) -> Result<TransferTxResult> {
    let transfer = store.create_transfer(params.from_account_id, params.to_account_id, params.amount)?;
    let from_entry = store.create_entry(params.from_account_id, -params.amount)?;
    let to_entry = store.create_entry(params.to_account_id, params.amount)?;

    let mut accounts = apply_in_id_order(
        store,
        &[
            (params.from_account_id, -params.amount),
            (params.to_account_id, params.amount),
        ],
    )?
    .into_iter();
    let (from_account, to_account) = match (accounts.next(), accounts.next()) {
        (Some(from), Some(to)) => (from, to),
        _ => return Err(Error::database("balance update returned too few rows")),
    };

    if from_account.currency != to_account.currency {
        return Err(Error::CurrencyMismatch(format!(
            "account {} is {} but account {} is {}",
            from_account.id, from_account.currency, to_account.id, to_account.currency
        )));
    }
    enforce_overdraft_policy(overdraft, &from_account)?;

    Ok(TransferTxResult {
        transfer,
        from_account,
        to_account,
        from_entry,
        to_entry,
    })
}

/// Transfer service
pub struct TransferService {
    store: Arc<DuckDbStore>,
    config: Arc<Config>,
}

impl TransferService {
    pub fn new(store: Arc<DuckDbStore>, config: Arc<Config>) -> Self {
        Self { store, config }
    }

    /// Run a transfer with the configured transaction timeout
    pub fn transfer_tx(&self, params: TransferTxParams) -> Result<TransferTxResult> {
        self.transfer_tx_with_deadline(params, self.config.default_deadline())
    }

    /// Run a transfer that is rolled back once `deadline` passes
    #[instrument(
        name = "transfer_tx",
        skip(self, params, deadline),
        fields(from = params.from_account_id, to = params.to_account_id, amount = params.amount)
    )]
    pub fn transfer_tx_with_deadline(
        &self,
        params: TransferTxParams,
        deadline: Option<Instant>,
    ) -> Result<TransferTxResult> {
        params.validate()?;

        let overdraft = self.config.overdraft_policy;
        match self
            .store
            .run_in_transaction_with_deadline(deadline, |q| execute_transfer(q, &params, overdraft))
        {
            Ok(result) => {
                info!(transfer_id = result.transfer.id, "transfer committed");
                Ok(result)
            }
            Err(err) => {
                debug!(error = %err, retryable = err.is_retryable(), "transfer rolled back");
                Err(err)
            }
        }
    }

    /// Transfer on behalf of `owner`
    ///
    /// The source account must belong to `owner`, both accounts must be in
    /// `currency`, and the amount must not exceed the configured maximum.
    pub fn create_transfer(
        &self,
        owner: &str,
        from_account_id: i64,
        to_account_id: i64,
        amount: i64,
        currency: &str,
    ) -> Result<TransferTxResult> {
        let currency: Currency = currency.parse()?;
        if amount <= 0 || amount > self.config.max_transfer_amount {
            return Err(Error::invalid_argument(format!(
                "amount must be between 1 and {}, got {}",
                self.config.max_transfer_amount, amount
            )));
        }

        let from = self.store.get_account(from_account_id)?;
        if !from.is_owned_by(owner) {
            return Err(Error::PermissionDenied(format!(
                "account {} doesn't belong to {}",
                from.id, owner
            )));
        }
        check_currency(&from, currency)?;

        let to = self.store.get_account(to_account_id)?;
        check_currency(&to, currency)?;

        self.transfer_tx(TransferTxParams::new(from_account_id, to_account_id, amount))
    }

    pub fn get_transfer(&self, id: i64) -> Result<Transfer> {
        self.store.get_transfer(id)
    }

    /// Fetch a transfer visible to `owner`, who must hold one of its two accounts
    pub fn get_transfer_for_owner(&self, owner: &str, id: i64) -> Result<Transfer> {
        let transfer = self.store.get_transfer(id)?;
        let from = self.store.get_account(transfer.from_account_id)?;
        let to = self.store.get_account(transfer.to_account_id)?;
        if !from.is_owned_by(owner) && !to.is_owned_by(owner) {
            return Err(Error::PermissionDenied(format!(
                "transfer {} doesn't involve an account of {}",
                id, owner
            )));
        }
        Ok(transfer)
    }

    /// Transfers leaving `from_account_id` or arriving at `to_account_id`
    pub fn list_transfers(
        &self,
        from_account_id: i64,
        to_account_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transfer>> {
        check_page(limit, offset)?;
        self.store.list_transfers(from_account_id, to_account_id, limit, offset)
    }

    pub fn get_entry(&self, id: i64) -> Result<Entry> {
        self.store.get_entry(id)
    }

    pub fn list_entries(&self, account_id: i64, limit: i64, offset: i64) -> Result<Vec<Entry>> {
        check_page(limit, offset)?;
        self.store.list_entries(account_id, limit, offset)
    }
}

fn check_currency(account: &Account, currency: Currency) -> Result<()> {
    if account.currency != currency {
        return Err(Error::CurrencyMismatch(format!(
            "account {} currency mismatch: {} vs {}",
            account.id, account.currency, currency
        )));
    }
    Ok(())
}

fn check_page(limit: i64, offset: i64) -> Result<()> {
    if limit <= 0 || offset < 0 {
        return Err(Error::invalid_argument(format!(
            "invalid page: limit {}, offset {}",
            limit, offset
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::result::ErrorKind;
    use crate::domain::NewUser;

    fn setup(policy: OverdraftPolicy) -> (Arc<DuckDbStore>, TransferService) {
        let store = Arc::new(DuckDbStore::open_in_memory().unwrap());
        store.ensure_schema().unwrap();
        let config = Config::default().with_overdraft_policy(policy);
        let service = TransferService::new(store.clone(), Arc::new(config));
        (store, service)
    }

    fn funded_account(store: &DuckDbStore, owner: &str, currency: Currency, balance: i64) -> Account {
        if store.get_user(owner).is_err() {
            store
                .create_user(&NewUser {
                    username: owner.to_string(),
                    hashed_password: "s$h".to_string(),
                    full_name: owner.to_string(),
                    email: format!("{}@example.com", owner),
                })
                .unwrap();
        }
        let account = store.create_account(owner, currency).unwrap();
        store.add_account_balance(account.id, balance).unwrap()
    }

    #[test]
    fn test_transfer_moves_funds_and_writes_entries() {
        let (store, service) = setup(OverdraftPolicy::Reject);
        let a = funded_account(&store, "alice", Currency::Usd, 1000);
        let b = funded_account(&store, "bob", Currency::Usd, 500);

        let result = service.transfer_tx(TransferTxParams::new(a.id, b.id, 300)).unwrap();

        assert_eq!(result.transfer.from_account_id, a.id);
        assert_eq!(result.transfer.to_account_id, b.id);
        assert_eq!(result.transfer.amount, 300);
        assert_eq!(result.from_entry.amount, -300);
        assert_eq!(result.from_entry.account_id, a.id);
        assert_eq!(result.to_entry.amount, 300);
        assert_eq!(result.to_entry.account_id, b.id);
        assert_eq!(result.from_account.balance, 700);
        assert_eq!(result.to_account.balance, 800);
    }

    #[test]
    fn test_apply_in_id_order_returns_input_order() {
        let (store, _) = setup(OverdraftPolicy::Allow);
        let a = funded_account(&store, "carol", Currency::Usd, 0);
        let b = funded_account(&store, "dave", Currency::Usd, 0);
        let c = funded_account(&store, "erin", Currency::Usd, 0);

        let updated = apply_in_id_order(store.as_ref(), &[(c.id, 3), (a.id, 1), (b.id, 2)]).unwrap();
        let ids: Vec<i64> = updated.iter().map(|acc| acc.id).collect();
        assert_eq!(ids, vec![c.id, a.id, b.id]);
        assert_eq!(updated[0].balance, 3);
        assert_eq!(updated[1].balance, 1);
        assert_eq!(updated[2].balance, 2);
    }

    #[test]
    fn test_overdraft_rejected_rolls_back_everything() {
        let (store, service) = setup(OverdraftPolicy::Reject);
        let a = funded_account(&store, "frank", Currency::Eur, 100);
        let b = funded_account(&store, "grace", Currency::Eur, 0);

        let err = service.transfer_tx(TransferTxParams::new(a.id, b.id, 101)).unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { balance: -1, .. }));

        assert_eq!(store.get_account(a.id).unwrap().balance, 100);
        assert_eq!(store.get_account(b.id).unwrap().balance, 0);
        assert!(store.list_entries(a.id, 10, 0).unwrap().is_empty());
        assert!(store.list_transfers(a.id, a.id, 10, 0).unwrap().is_empty());
    }

    #[test]
    fn test_overdraft_allowed() {
        let (store, service) = setup(OverdraftPolicy::Allow);
        let a = funded_account(&store, "heidi", Currency::Cad, 0);
        let b = funded_account(&store, "ivan", Currency::Cad, 0);

        let result = service.transfer_tx(TransferTxParams::new(a.id, b.id, 50)).unwrap();
        assert_eq!(result.from_account.balance, -50);
        assert_eq!(result.to_account.balance, 50);
    }

    #[test]
    fn test_engine_rejects_mixed_currencies() {
        let (store, service) = setup(OverdraftPolicy::Allow);
        let a = funded_account(&store, "judy", Currency::Usd, 100);
        let b = funded_account(&store, "mallory", Currency::Eur, 100);

        let err = service.transfer_tx(TransferTxParams::new(a.id, b.id, 10)).unwrap_err();
        assert!(matches!(err, Error::CurrencyMismatch(_)));
        assert_eq!(store.get_account(a.id).unwrap().balance, 100);
    }

    #[test]
    fn test_create_transfer_checks_request() {
        let (store, service) = setup(OverdraftPolicy::Reject);
        let a = funded_account(&store, "niaj", Currency::Usd, 1000);
        let b = funded_account(&store, "olivia", Currency::Usd, 0);
        let e = funded_account(&store, "olivia", Currency::Eur, 0);

        let err = service.create_transfer("olivia", a.id, b.id, 10, "USD").unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));

        let err = service.create_transfer("niaj", a.id, e.id, 10, "USD").unwrap_err();
        assert!(matches!(err, Error::CurrencyMismatch(_)));

        let err = service.create_transfer("niaj", a.id, b.id, 10, "GBP").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = service.create_transfer("niaj", a.id, b.id, 2501, "USD").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = service.create_transfer("niaj", a.id, 9999, 10, "USD").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let ok = service.create_transfer("niaj", a.id, b.id, 250, "usd").unwrap();
        assert_eq!(ok.from_account.balance, 750);
        assert_eq!(service.get_transfer(ok.transfer.id).unwrap(), ok.transfer);
        assert_eq!(service.get_entry(ok.to_entry.id).unwrap(), ok.to_entry);
    }

    #[test]
    fn test_transfer_visible_only_to_involved_owners() {
        let (store, service) = setup(OverdraftPolicy::Reject);
        let a = funded_account(&store, "peggy", Currency::Usd, 500);
        let b = funded_account(&store, "rupert", Currency::Usd, 0);
        funded_account(&store, "sybil", Currency::Usd, 0);

        let id = service.create_transfer("peggy", a.id, b.id, 100, "USD").unwrap().transfer.id;

        assert_eq!(service.get_transfer_for_owner("peggy", id).unwrap().id, id);
        assert_eq!(service.get_transfer_for_owner("rupert", id).unwrap().id, id);

        let err = service.get_transfer_for_owner("sybil", id).unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));

        let err = service.get_transfer_for_owner("peggy", id + 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_list_requires_positive_limit() {
        let (_, service) = setup(OverdraftPolicy::Reject);
        assert!(service.list_entries(1, 0, 0).is_err());
        assert!(service.list_transfers(1, 1, 5, -1).is_err());
    }
}
