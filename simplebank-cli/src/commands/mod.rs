//! CLI command implementations

pub mod account;
pub mod entries;
pub mod status;
pub mod transfer;
pub mod user;

use std::path::PathBuf;

use anyhow::{Context, Result};
use simplebank_core::SimplebankContext;
use tracing::debug;

/// Get the data directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("SIMPLEBANK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(".simplebank"))
}

/// Open the ledger context
pub fn get_context() -> Result<SimplebankContext> {
    let data_dir = get_data_dir()?;
    debug!(dir = %data_dir.display(), "using data directory");
    SimplebankContext::new(&data_dir)
        .with_context(|| format!("Failed to open ledger in {}", data_dir.display()))
}
