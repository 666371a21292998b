//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "ledger": {
//!     "overdraftPolicy": "reject",
//!     "maxTransferAmount": 2500,
//!     "maxAdjustment": 1500,
//!     "transactionTimeoutMs": 2000,
//!     "retry": { "maxAttempts": 5, "initialDelayMs": 10, "maxDelayMs": 200 }
//!   }
//! }
//! ```
//! Keys this crate does not know about are kept when saving.

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::result::{Error, Result};
use crate::services::RetryPolicy;

/// What happens when a debit would take a balance below zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverdraftPolicy {
    /// Roll the whole operation back with `InsufficientFunds`
    #[default]
    Reject,
    /// Let balances go negative
    Allow,
}

impl std::str::FromStr for OverdraftPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Ok(OverdraftPolicy::Reject),
            "allow" => Ok(OverdraftPolicy::Allow),
            other => Err(Error::Config(format!(
                "unknown overdraft policy '{}', expected 'reject' or 'allow'",
                other
            ))),
        }
    }
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    ledger: LedgerSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerSettings {
    #[serde(default)]
    overdraft_policy: OverdraftPolicy,
    #[serde(default = "default_max_transfer_amount")]
    max_transfer_amount: i64,
    #[serde(default = "default_max_adjustment")]
    max_adjustment: i64,
    #[serde(default)]
    transaction_timeout_ms: Option<u64>,
    #[serde(default)]
    retry: RetryPolicy,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            overdraft_policy: OverdraftPolicy::default(),
            max_transfer_amount: default_max_transfer_amount(),
            max_adjustment: default_max_adjustment(),
            transaction_timeout_ms: None,
            retry: RetryPolicy::default(),
            other: HashMap::new(),
        }
    }
}

fn default_max_transfer_amount() -> i64 {
    2500
}

fn default_max_adjustment() -> i64 {
    1500
}

/// Ledger configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub overdraft_policy: OverdraftPolicy,
    /// Upper bound for a single request-layer transfer, in minor units
    pub max_transfer_amount: i64,
    /// Upper bound for a single credit or debit, in minor units
    pub max_adjustment: i64,
    /// Deadline applied to every transfer transaction when set
    pub transaction_timeout_ms: Option<u64>,
    pub retry: RetryPolicy,
    // Keep the raw settings for preservation when saving
    raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_settings(SettingsFile::default())
    }
}

impl Config {
    fn from_settings(raw: SettingsFile) -> Self {
        Self {
            overdraft_policy: raw.ledger.overdraft_policy,
            max_transfer_amount: raw.ledger.max_transfer_amount,
            max_adjustment: raw.ledger.max_adjustment,
            transaction_timeout_ms: raw.ledger.transaction_timeout_ms,
            retry: raw.ledger.retry.clone(),
            raw_settings: raw,
        }
    }

    /// Load config from the data directory
    ///
    /// Environment variables win over the file:
    /// - `SIMPLEBANK_OVERDRAFT` (`allow` or `reject`)
    /// - `SIMPLEBANK_TX_TIMEOUT_MS` (milliseconds, `0` disables the deadline)
    pub fn load(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).map_err(|e| {
                Error::Config(format!("{}: {}", settings_path.display(), e))
            })?
        } else {
            SettingsFile::default()
        };

        let mut config = Self::from_settings(raw);
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(
            std::env::var("SIMPLEBANK_OVERDRAFT").ok().as_deref(),
            std::env::var("SIMPLEBANK_TX_TIMEOUT_MS").ok().as_deref(),
        )
    }

    /// Invalid values fail the load instead of being dropped
    fn apply_overrides(&mut self, overdraft: Option<&str>, timeout_ms: Option<&str>) -> Result<()> {
        if let Some(value) = overdraft {
            self.overdraft_policy = value.parse()?;
        }

        if let Some(value) = timeout_ms {
            let ms = value.trim().parse::<u64>().map_err(|_| {
                Error::Config(format!(
                    "SIMPLEBANK_TX_TIMEOUT_MS must be a number of milliseconds, got '{}'",
                    value
                ))
            })?;
            self.transaction_timeout_ms = if ms == 0 { None } else { Some(ms) };
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.max_transfer_amount <= 0 {
            return Err(Error::Config("maxTransferAmount must be positive".into()));
        }
        if self.max_adjustment <= 0 {
            return Err(Error::Config("maxAdjustment must be positive".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry.maxAttempts must be at least 1".into()));
        }
        Ok(())
    }

    /// Save config to the data directory
    /// Preserves settings this crate doesn't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join("settings.json");

        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_else(|e| {
                warn!(error = %e, "settings.json unreadable, rewriting from loaded config");
                self.raw_settings.clone()
            })
        } else {
            self.raw_settings.clone()
        };

        settings.ledger.overdraft_policy = self.overdraft_policy;
        settings.ledger.max_transfer_amount = self.max_transfer_amount;
        settings.ledger.max_adjustment = self.max_adjustment;
        settings.ledger.transaction_timeout_ms = self.transaction_timeout_ms;
        settings.ledger.retry = self.retry.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    pub fn with_overdraft_policy(mut self, policy: OverdraftPolicy) -> Self {
        self.overdraft_policy = policy;
        self
    }

    /// Deadline for a transaction starting now, if a timeout is configured
    pub fn default_deadline(&self) -> Option<Instant> {
        self.transaction_timeout_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms))
    }
}
