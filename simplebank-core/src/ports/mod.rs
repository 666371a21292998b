//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces the services depend on. The DuckDB adapter
//! implements them.

mod ledger_store;

pub use ledger_store::{LedgerStore, TransactionExecutor};
