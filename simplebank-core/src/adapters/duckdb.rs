//! DuckDB ledger store implementation

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::types::Type;
use duckdb::{params, Connection, Row};
use tracing::{debug, warn};

use crate::domain::result::{Error, Result};
use crate::domain::{Account, Currency, Entry, NewUser, Transfer, User};
use crate::ports::{LedgerStore, TransactionExecutor};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of attempts when the database file is locked on open
const MAX_OPEN_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const ACCOUNT_COLUMNS: &str = "id, owner, balance, currency, created_at::VARCHAR";
const ENTRY_COLUMNS: &str = "id, account_id, amount, created_at::VARCHAR";
const TRANSFER_COLUMNS: &str = "id, from_account_id, to_account_id, amount, created_at::VARCHAR";
const USER_COLUMNS: &str =
    "username, hashed_password, full_name, email, password_changed_at::VARCHAR, created_at::VARCHAR";

/// Check if an open error indicates a file locking issue that should be retried
fn is_retryable_open_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("could not set lock")
}

/// DuckDB-backed ledger store
///
/// Holds one root connection to the database instance. Every operation and
/// every transaction runs on its own connection cloned from the root, so
/// concurrent callers never share a connection and the mutex is held only
/// for the clone itself. Isolation between concurrent writers comes from
/// DuckDB's MVCC: a write-write conflict on an account row fails the later
/// transaction with a conflict error instead of blocking.
pub struct DuckDbStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbStore {
    /// Open (or create) a database file
    ///
    /// Retries with exponential backoff while the file is locked by another
    /// process.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut attempt = 0;
        loop {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    attempt += 1;
                    if !is_retryable_open_error(&err_msg) || attempt >= MAX_OPEN_RETRIES {
                        return Err(e.into());
                    }
                    let delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt - 1));
                    warn!(
                        path = %db_path.display(),
                        attempt,
                        max_attempts = MAX_OPEN_RETRIES,
                        delay_ms = delay.as_millis() as u64,
                        error = %err_msg,
                        "database busy, retrying open"
                    );
                    thread::sleep(delay);
                }
            }
        }
    }

    /// Open a private in-memory database (tests, demos)
    pub fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> duckdb::Result<Connection> {
        // Extension autoloading stays off: the ledger needs nothing beyond core DuckDB
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Connection::open_with_flags(db_path, config)
    }

    /// Path of the database file, `None` for in-memory stores
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Run database migrations
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.connect()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    /// Clone a fresh connection to the same database instance
    fn connect(&self) -> Result<Connection> {
        let root = self
            .conn
            .lock()
            .map_err(|_| Error::database("connection mutex poisoned"))?;
        Ok(root.try_clone()?)
    }

    /// Run `f` against an auto-commit handle on its own connection
    fn with_queries<T>(&self, f: impl FnOnce(&Queries<'_>) -> Result<T>) -> Result<T> {
        let conn = self.connect()?;
        f(&Queries::new(&conn, None))
    }

    // === Audit queries ===

    /// Row counts of the ledger tables
    pub fn get_counts(&self) -> Result<LedgerCounts> {
        let conn = self.connect()?;
        let counts = conn.query_row(
            "SELECT (SELECT COUNT(*) FROM users),
                    (SELECT COUNT(*) FROM accounts),
                    (SELECT COUNT(*) FROM transfers),
                    (SELECT COUNT(*) FROM entries)",
            [],
            |row| {
                Ok(LedgerCounts {
                    users: row.get(0)?,
                    accounts: row.get(1)?,
                    transfers: row.get(2)?,
                    entries: row.get(3)?,
                })
            },
        )?;
        Ok(counts)
    }

    /// Number of accounts and summed balance per currency
    pub fn get_balance_totals(&self) -> Result<Vec<CurrencyTotal>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT currency, COUNT(*), CAST(SUM(balance) AS BIGINT)
             FROM accounts
             GROUP BY currency
             ORDER BY currency",
        )?;
        let rows = stmt.query_map([], |row| {
            let currency: String = row.get(0)?;
            Ok(CurrencyTotal {
                currency: parse_currency(0, &currency)?,
                accounts: row.get(1)?,
                total_balance: row.get(2)?,
            })
        })?;

        let mut totals = Vec::new();
        for row in rows {
            totals.push(row?);
        }
        Ok(totals)
    }

    /// Sum of every entry amount; zero for a consistent ledger
    pub fn sum_entries(&self) -> Result<i64> {
        let conn = self.connect()?;
        let sum = conn.query_row(
            "SELECT CAST(COALESCE(SUM(amount), 0) AS BIGINT) FROM entries",
            [],
            |row| row.get(0),
        )?;
        Ok(sum)
    }

    /// Entries whose account no longer exists
    pub fn check_orphaned_entries(&self) -> Result<Vec<i64>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT e.id FROM entries e
             LEFT JOIN accounts a ON e.account_id = a.id
             WHERE a.id IS NULL
             ORDER BY e.id",
        )?;
        let ids = stmt.query_map([], |row| row.get::<_, i64>(0))?;

        let mut result = Vec::new();
        for id in ids {
            result.push(id?);
        }
        Ok(result)
    }

    /// Accounts whose entries do not add up to their transfer history
    pub fn check_entry_transfer_mismatches(&self) -> Result<Vec<i64>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "WITH by_entries AS (
                 SELECT account_id, SUM(amount) AS total FROM entries GROUP BY account_id
             ),
             by_transfers AS (
                 SELECT account_id, SUM(delta) AS total FROM (
                     SELECT to_account_id AS account_id, amount AS delta FROM transfers
                     UNION ALL
                     SELECT from_account_id AS account_id, -amount AS delta FROM transfers
                 ) GROUP BY account_id
             )
             SELECT COALESCE(e.account_id, t.account_id) AS account_id
             FROM by_entries e
             FULL OUTER JOIN by_transfers t ON e.account_id = t.account_id
             WHERE COALESCE(e.total, 0) <> COALESCE(t.total, 0)
             ORDER BY account_id",
        )?;
        let ids = stmt.query_map([], |row| row.get::<_, i64>(0))?;

        let mut result = Vec::new();
        for id in ids {
            result.push(id?);
        }
        Ok(result)
    }
}

/// Row counts reported by [`DuckDbStore::get_counts`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerCounts {
    pub users: i64,
    pub accounts: i64,
    pub transfers: i64,
    pub entries: i64,
}

/// Per-currency balance total
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyTotal {
    pub currency: Currency,
    pub accounts: i64,
    pub total_balance: i64,
}

impl TransactionExecutor for DuckDbStore {
    fn run_in_transaction_with_deadline<T, F>(
        &self,
        deadline: Option<Instant>,
        work: F,
    ) -> Result<T>
    where
        F: FnOnce(&dyn LedgerStore) -> Result<T>,
    {
        let mut conn = self.connect()?;
        // Dropping `tx` without commit rolls back, which covers panics in `work`
        let tx = conn.transaction()?;

        let outcome = {
            let queries = Queries::new(&tx, deadline);
            work(&queries).and_then(|value| {
                queries.check_deadline()?;
                Ok(value)
            })
        };

        match outcome {
            Ok(value) => {
                tx.commit()?;
                debug!("transaction committed");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(error = %rollback_err, "rollback failed, connection discarded");
                }
                debug!(error = %err, "transaction rolled back");
                Err(err)
            }
        }
    }
}

impl LedgerStore for DuckDbStore {
    fn get_account(&self, id: i64) -> Result<Account> {
        self.with_queries(|q| q.get_account(id))
    }

    fn create_account(&self, owner: &str, currency: Currency) -> Result<Account> {
        self.with_queries(|q| q.create_account(owner, currency))
    }

    fn list_accounts_by_owner(&self, owner: &str, limit: i64, offset: i64) -> Result<Vec<Account>> {
        self.with_queries(|q| q.list_accounts_by_owner(owner, limit, offset))
    }

    fn add_account_balance(&self, id: i64, delta: i64) -> Result<Account> {
        self.with_queries(|q| q.add_account_balance(id, delta))
    }

    fn delete_account(&self, id: i64, owner: &str) -> Result<()> {
        // Existence, reference and delete checks must see one snapshot
        self.run_in_transaction(|q| q.delete_account(id, owner))
    }

    fn create_entry(&self, account_id: i64, amount: i64) -> Result<Entry> {
        self.with_queries(|q| q.create_entry(account_id, amount))
    }

    fn get_entry(&self, id: i64) -> Result<Entry> {
        self.with_queries(|q| q.get_entry(id))
    }

    fn list_entries(&self, account_id: i64, limit: i64, offset: i64) -> Result<Vec<Entry>> {
        self.with_queries(|q| q.list_entries(account_id, limit, offset))
    }

    fn create_transfer(&self, from_account_id: i64, to_account_id: i64, amount: i64) -> Result<Transfer> {
        self.with_queries(|q| q.create_transfer(from_account_id, to_account_id, amount))
    }

    fn get_transfer(&self, id: i64) -> Result<Transfer> {
        self.with_queries(|q| q.get_transfer(id))
    }

    fn list_transfers(
        &self,
        from_account_id: i64,
        to_account_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transfer>> {
        self.with_queries(|q| q.list_transfers(from_account_id, to_account_id, limit, offset))
    }

    fn create_user(&self, user: &NewUser) -> Result<User> {
        self.with_queries(|q| q.create_user(user))
    }

    fn get_user(&self, username: &str) -> Result<User> {
        self.with_queries(|q| q.get_user(username))
    }
}

/// Statement-level ledger primitives over one connection
///
/// Used on a plain connection for auto-commit calls, and on an open
/// transaction inside `run_in_transaction`.
pub struct Queries<'c> {
    conn: &'c Connection,
    deadline: Option<Instant>,
}

impl<'c> Queries<'c> {
    pub fn new(conn: &'c Connection, deadline: Option<Instant>) -> Self {
        Self { conn, deadline }
    }

    fn check_deadline(&self) -> Result<()> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Error::DeadlineExceeded(
                "transaction deadline passed".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn account_exists(&self, id: i64) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM accounts WHERE id = ?",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn ensure_account_exists(&self, id: i64) -> Result<()> {
        if self.account_exists(id)? {
            Ok(())
        } else {
            Err(Error::not_found(format!("account {}", id)))
        }
    }

    fn user_exists(&self, username: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?",
            params![username],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn count_account_references(&self, id: i64) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT (SELECT COUNT(*) FROM entries WHERE account_id = ?)
                  + (SELECT COUNT(*) FROM transfers WHERE from_account_id = ? OR to_account_id = ?)",
            params![id, id, id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

impl LedgerStore for Queries<'_> {
    fn get_account(&self, id: i64) -> Result<Account> {
        self.check_deadline()?;
        self.conn
            .query_row(
                &format!("SELECT {} FROM accounts WHERE id = ?", ACCOUNT_COLUMNS),
                params![id],
                row_to_account,
            )
            .map_err(|e| missing(e, format!("account {}", id)))
    }

    fn create_account(&self, owner: &str, currency: Currency) -> Result<Account> {
        self.check_deadline()?;
        if !self.user_exists(owner)? {
            return Err(Error::constraint(format!("owner {} does not exist", owner)));
        }
        let account = self.conn.query_row(
            &format!(
                "INSERT INTO accounts (owner, balance, currency, created_at)
                 VALUES (?, 0, ?, CAST(? AS TIMESTAMP))
                 RETURNING {}",
                ACCOUNT_COLUMNS
            ),
            params![owner, currency.as_str(), format_timestamp(Utc::now())],
            row_to_account,
        )?;
        Ok(account)
    }

    fn list_accounts_by_owner(&self, owner: &str, limit: i64, offset: i64) -> Result<Vec<Account>> {
        self.check_deadline()?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM accounts WHERE owner = ? ORDER BY id LIMIT ? OFFSET ?",
            ACCOUNT_COLUMNS
        ))?;
        let rows = stmt.query_map(params![owner, limit, offset], row_to_account)?;

        let mut accounts = Vec::new();
        for row in rows {
            accounts.push(row?);
        }
        Ok(accounts)
    }

    fn add_account_balance(&self, id: i64, delta: i64) -> Result<Account> {
        self.check_deadline()?;
        // Single read-modify-write in the database; never computed in Rust
        self.conn
            .query_row(
                &format!(
                    "UPDATE accounts SET balance = balance + ? WHERE id = ? RETURNING {}",
                    ACCOUNT_COLUMNS
                ),
                params![delta, id],
                row_to_account,
            )
            .map_err(|e| missing(e, format!("account {}", id)))
    }

    fn delete_account(&self, id: i64, owner: &str) -> Result<()> {
        self.check_deadline()?;
        let account = self.get_account(id)?;
        if !account.is_owned_by(owner) {
            return Err(Error::not_found(format!("account {} for owner {}", id, owner)));
        }
        let references = self.count_account_references(id)?;
        if references > 0 {
            return Err(Error::constraint(format!(
                "account {} is referenced by {} ledger row(s)",
                id, references
            )));
        }
        self.conn.execute(
            "DELETE FROM accounts WHERE id = ? AND owner = ?",
            params![id, owner],
        )?;
        Ok(())
    }

    fn create_entry(&self, account_id: i64, amount: i64) -> Result<Entry> {
        self.check_deadline()?;
        self.ensure_account_exists(account_id)?;
        let entry = self.conn.query_row(
            &format!(
                "INSERT INTO entries (account_id, amount, created_at)
                 VALUES (?, ?, CAST(? AS TIMESTAMP))
                 RETURNING {}",
                ENTRY_COLUMNS
            ),
            params![account_id, amount, format_timestamp(Utc::now())],
            row_to_entry,
        )?;
        Ok(entry)
    }

    fn get_entry(&self, id: i64) -> Result<Entry> {
        self.check_deadline()?;
        self.conn
            .query_row(
                &format!("SELECT {} FROM entries WHERE id = ?", ENTRY_COLUMNS),
                params![id],
                row_to_entry,
            )
            .map_err(|e| missing(e, format!("entry {}", id)))
    }

    fn list_entries(&self, account_id: i64, limit: i64, offset: i64) -> Result<Vec<Entry>> {
        self.check_deadline()?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM entries WHERE account_id = ? ORDER BY id LIMIT ? OFFSET ?",
            ENTRY_COLUMNS
        ))?;
        let rows = stmt.query_map(params![account_id, limit, offset], row_to_entry)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    fn create_transfer(&self, from_account_id: i64, to_account_id: i64, amount: i64) -> Result<Transfer> {
        self.check_deadline()?;
        self.ensure_account_exists(from_account_id)?;
        self.ensure_account_exists(to_account_id)?;
        let transfer = self.conn.query_row(
            &format!(
                "INSERT INTO transfers (from_account_id, to_account_id, amount, created_at)
                 VALUES (?, ?, ?, CAST(? AS TIMESTAMP))
                 RETURNING {}",
                TRANSFER_COLUMNS
            ),
            params![from_account_id, to_account_id, amount, format_timestamp(Utc::now())],
            row_to_transfer,
        )?;
        Ok(transfer)
    }

    fn get_transfer(&self, id: i64) -> Result<Transfer> {
        self.check_deadline()?;
        self.conn
            .query_row(
                &format!("SELECT {} FROM transfers WHERE id = ?", TRANSFER_COLUMNS),
                params![id],
                row_to_transfer,
            )
            .map_err(|e| missing(e, format!("transfer {}", id)))
    }

    fn list_transfers(
        &self,
        from_account_id: i64,
        to_account_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transfer>> {
        self.check_deadline()?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM transfers
             WHERE from_account_id = ? OR to_account_id = ?
             ORDER BY id LIMIT ? OFFSET ?",
            TRANSFER_COLUMNS
        ))?;
        let rows = stmt.query_map(
            params![from_account_id, to_account_id, limit, offset],
            row_to_transfer,
        )?;

        let mut transfers = Vec::new();
        for row in rows {
            transfers.push(row?);
        }
        Ok(transfers)
    }

    fn create_user(&self, user: &NewUser) -> Result<User> {
        self.check_deadline()?;
        let now = format_timestamp(Utc::now());
        let created = self.conn.query_row(
            &format!(
                "INSERT INTO users (username, hashed_password, full_name, email, password_changed_at, created_at)
                 VALUES (?, ?, ?, ?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP))
                 RETURNING {}",
                USER_COLUMNS
            ),
            params![
                user.username,
                user.hashed_password,
                user.full_name,
                user.email,
                now,
                now
            ],
            row_to_user,
        )?;
        Ok(created)
    }

    fn get_user(&self, username: &str) -> Result<User> {
        self.check_deadline()?;
        self.conn
            .query_row(
                &format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS),
                params![username],
                row_to_user,
            )
            .map_err(|e| missing(e, format!("user {}", username)))
    }
}

// Helper functions

/// Convert a driver error, naming the missing row when the query found nothing
fn missing(err: duckdb::Error, what: String) -> Error {
    match err {
        duckdb::Error::QueryReturnedNoRows => Error::NotFound(what),
        other => other.into(),
    }
}

fn row_to_account(row: &Row<'_>) -> duckdb::Result<Account> {
    let currency: String = row.get(3)?;
    let created_at: String = row.get(4)?;
    Ok(Account {
        id: row.get(0)?,
        owner: row.get(1)?,
        balance: row.get(2)?,
        currency: parse_currency(3, &currency)?,
        created_at: parse_timestamp(4, &created_at)?,
    })
}

fn row_to_entry(row: &Row<'_>) -> duckdb::Result<Entry> {
    let created_at: String = row.get(3)?;
    Ok(Entry {
        id: row.get(0)?,
        account_id: row.get(1)?,
        amount: row.get(2)?,
        created_at: parse_timestamp(3, &created_at)?,
    })
}

fn row_to_transfer(row: &Row<'_>) -> duckdb::Result<Transfer> {
    let created_at: String = row.get(4)?;
    Ok(Transfer {
        id: row.get(0)?,
        from_account_id: row.get(1)?,
        to_account_id: row.get(2)?,
        amount: row.get(3)?,
        created_at: parse_timestamp(4, &created_at)?,
    })
}

fn row_to_user(row: &Row<'_>) -> duckdb::Result<User> {
    let password_changed_at: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    Ok(User {
        username: row.get(0)?,
        hashed_password: row.get(1)?,
        full_name: row.get(2)?,
        email: row.get(3)?,
        password_changed_at: parse_timestamp(4, &password_changed_at)?,
        created_at: parse_timestamp(5, &created_at)?,
    })
}

fn parse_currency(idx: usize, s: &str) -> duckdb::Result<Currency> {
    s.parse()
        .map_err(|e: Error| duckdb::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Format a timestamp the way DuckDB renders `TIMESTAMP` as text
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// Parse a `TIMESTAMP::VARCHAR` value; DuckDB omits the fraction when it is zero
fn parse_timestamp(idx: usize, s: &str) -> duckdb::Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| duckdb::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::result::ErrorKind;

    fn test_store() -> DuckDbStore {
        let store = DuckDbStore::open_in_memory().unwrap();
        store.ensure_schema().unwrap();
        store
    }

    fn create_user(store: &DuckDbStore, username: &str) -> User {
        store
            .create_user(&NewUser {
                username: username.to_string(),
                hashed_password: "c2FsdA==$aGFzaA==".to_string(),
                full_name: format!("{} Test", username),
                email: format!("{}@example.com", username),
            })
            .unwrap()
    }

    #[test]
    fn test_timestamp_format_round_trips_through_duckdb_text() {
        let parsed = parse_timestamp(0, "2024-03-01 10:11:12.345678").unwrap();
        assert_eq!(format_timestamp(parsed), "2024-03-01 10:11:12.345678");

        let whole_second = parse_timestamp(0, "2024-03-01 10:11:12").unwrap();
        assert_eq!(format_timestamp(whole_second), "2024-03-01 10:11:12.000000");
    }

    #[test]
    fn test_create_and_get_account() {
        let store = test_store();
        create_user(&store, "alice");

        let account = store.create_account("alice", Currency::Usd).unwrap();
        assert!(account.id > 0);
        assert_eq!(account.owner, "alice");
        assert_eq!(account.balance, 0);
        assert_eq!(account.currency, Currency::Usd);

        let fetched = store.get_account(account.id).unwrap();
        assert_eq!(fetched, account);
    }

    #[test]
    fn test_get_missing_account_is_not_found() {
        let store = test_store();
        let err = store.get_account(404).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("account 404"));
    }

    #[test]
    fn test_create_account_requires_existing_owner() {
        let store = test_store();
        let err = store.create_account("ghost", Currency::Eur).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    }

    #[test]
    fn test_one_account_per_owner_and_currency() {
        let store = test_store();
        create_user(&store, "bob");
        store.create_account("bob", Currency::Cad).unwrap();

        let err = store.create_account("bob", Currency::Cad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);

        // A different currency is fine
        assert!(store.create_account("bob", Currency::Usd).is_ok());
    }

    #[test]
    fn test_add_account_balance_returns_updated_row() {
        let store = test_store();
        create_user(&store, "carol");
        let account = store.create_account("carol", Currency::Usd).unwrap();

        let credited = store.add_account_balance(account.id, 1_000).unwrap();
        assert_eq!(credited.balance, 1_000);

        // No funds check at this level
        let debited = store.add_account_balance(account.id, -1_500).unwrap();
        assert_eq!(debited.balance, -500);
        assert_eq!(debited.created_at, account.created_at);
    }

    #[test]
    fn test_add_balance_to_missing_account_is_not_found() {
        let store = test_store();
        let err = store.add_account_balance(77, 10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_entries_and_transfers_check_account_references() {
        let store = test_store();
        create_user(&store, "dave");
        let account = store.create_account("dave", Currency::Usd).unwrap();

        let err = store.create_entry(999, 10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = store.create_transfer(account.id, 999, 10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_transfer_check_constraints() {
        let store = test_store();
        create_user(&store, "erin");
        let usd = store.create_account("erin", Currency::Usd).unwrap();
        let eur = store.create_account("erin", Currency::Eur).unwrap();

        let err = store.create_transfer(usd.id, eur.id, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);

        let err = store.create_transfer(usd.id, usd.id, 10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);

        let transfer = store.create_transfer(usd.id, eur.id, 10).unwrap();
        assert_eq!(store.get_transfer(transfer.id).unwrap(), transfer);
    }

    #[test]
    fn test_list_accounts_by_owner_pages_in_id_order() {
        let store = test_store();
        create_user(&store, "frank");
        create_user(&store, "grace");
        let a = store.create_account("frank", Currency::Usd).unwrap();
        let b = store.create_account("frank", Currency::Eur).unwrap();
        let c = store.create_account("frank", Currency::Cad).unwrap();
        store.create_account("grace", Currency::Usd).unwrap();

        let first = store.list_accounts_by_owner("frank", 2, 0).unwrap();
        assert_eq!(first, vec![a, b]);
        let second = store.list_accounts_by_owner("frank", 2, 2).unwrap();
        assert_eq!(second, vec![c]);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let store = test_store();
        create_user(&store, "heidi");
        let account = store.create_account("heidi", Currency::Usd).unwrap();

        let result: Result<()> = store.run_in_transaction(|q| {
            q.add_account_balance(account.id, 500)?;
            q.create_entry(account.id, 500)?;
            Err(Error::invalid_argument("abort"))
        });
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidArgument);

        assert_eq!(store.get_account(account.id).unwrap().balance, 0);
        assert!(store.list_entries(account.id, 10, 0).unwrap().is_empty());
    }

    #[test]
    fn test_transaction_commits_on_success() {
        let store = test_store();
        create_user(&store, "ivan");
        let account = store.create_account("ivan", Currency::Usd).unwrap();

        let updated = store
            .run_in_transaction(|q| {
                q.add_account_balance(account.id, 250)?;
                q.add_account_balance(account.id, 250)
            })
            .unwrap();
        assert_eq!(updated.balance, 500);
        assert_eq!(store.get_account(account.id).unwrap().balance, 500);
    }

    #[test]
    fn test_expired_deadline_rolls_back() {
        let store = test_store();
        create_user(&store, "judy");
        let account = store.create_account("judy", Currency::Usd).unwrap();

        let deadline = Instant::now();
        let result = store.run_in_transaction_with_deadline(Some(deadline), |q| {
            q.add_account_balance(account.id, 100)
        });
        let err = result.unwrap_err();
        assert!(matches!(err, Error::DeadlineExceeded(_)));
        assert!(err.is_retryable());
        assert_eq!(store.get_account(account.id).unwrap().balance, 0);
    }

    #[test]
    fn test_delete_account_refuses_referenced_account() {
        let store = test_store();
        create_user(&store, "mallory");
        let usd = store.create_account("mallory", Currency::Usd).unwrap();
        let eur = store.create_account("mallory", Currency::Eur).unwrap();
        store.create_entry(usd.id, 10).unwrap();

        let err = store.delete_account(usd.id, "mallory").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
        assert!(store.get_account(usd.id).is_ok());

        // Wrong owner looks like a missing account
        let err = store.delete_account(eur.id, "someone-else").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        store.delete_account(eur.id, "mallory").unwrap();
        assert_eq!(
            store.get_account(eur.id).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_duplicate_user_is_constraint_violation() {
        let store = test_store();
        create_user(&store, "niaj");
        let err = store
            .create_user(&NewUser {
                username: "niaj".to_string(),
                hashed_password: "x$y".to_string(),
                full_name: "Other".to_string(),
                email: "other@example.com".to_string(),
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    }

    #[test]
    fn test_file_database_persists_between_opens() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db_path = temp_dir.path().join("ledger.duckdb");

        let account_id = {
            let store = DuckDbStore::new(&db_path).unwrap();
            store.ensure_schema().unwrap();
            create_user(&store, "olivia");
            let account = store.create_account("olivia", Currency::Eur).unwrap();
            store.add_account_balance(account.id, 42).unwrap();
            account.id
        };

        let store = DuckDbStore::new(&db_path).unwrap();
        store.ensure_schema().unwrap();
        assert_eq!(store.db_path(), Some(db_path.as_path()));
        assert_eq!(store.get_account(account_id).unwrap().balance, 42);
    }
}
