//! SimpleBank Core - transactional double-entry ledger
//!
//! This crate follows hexagonal architecture:
//!
//! - **domain**: Core entities (Account, Entry, Transfer, User) and errors
//! - **ports**: Trait definitions for the storage layer (LedgerStore, TransactionExecutor)
//! - **services**: Business logic orchestration (transfers, accounts, users, audit)
//! - **adapters**: Concrete implementations (DuckDB)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use adapters::duckdb::DuckDbStore;
use config::Config;
use services::*;

// Re-export commonly used types at crate root
pub use config::OverdraftPolicy;
pub use domain::result::{Error, ErrorKind, Result, Status};
pub use domain::{Account, Currency, Entry, NewUser, Transfer, TransferTxParams, TransferTxResult, User};
pub use ports::{LedgerStore, TransactionExecutor};

/// File name of the ledger database inside the data directory
pub const DB_FILENAME: &str = "simplebank.duckdb";

/// Main context for SimpleBank operations
///
/// This is the primary entry point for all business logic. It holds
/// the store, configuration, and all services.
pub struct SimplebankContext {
    pub config: Arc<Config>,
    pub store: Arc<DuckDbStore>,
    pub user_service: UserService,
    pub account_service: AccountService,
    pub transfer_service: TransferService,
    pub status_service: StatusService,
}

impl SimplebankContext {
    /// Open the ledger in `data_dir`, creating the directory and schema as needed
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let config = Config::load(data_dir)?;

        let db_path = data_dir.join(DB_FILENAME);
        debug!(path = %db_path.display(), "opening ledger");
        let store = DuckDbStore::new(&db_path)?;
        store.ensure_schema()?;

        Ok(Self::from_store(config, Arc::new(store)))
    }

    /// Build the services over an already opened (and migrated) store
    pub fn from_store(config: Config, store: Arc<DuckDbStore>) -> Self {
        let config = Arc::new(config);
        Self {
            user_service: UserService::new(Arc::clone(&store)),
            account_service: AccountService::new(Arc::clone(&store), Arc::clone(&config)),
            transfer_service: TransferService::new(Arc::clone(&store), Arc::clone(&config)),
            status_service: StatusService::new(Arc::clone(&store)),
            config,
            store,
        }
    }
}
