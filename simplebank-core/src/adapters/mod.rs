//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the LedgerStore and TransactionExecutor ports

pub mod duckdb;
