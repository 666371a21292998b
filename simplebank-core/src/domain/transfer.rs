//! Transfer domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};
use super::{Account, Entry};

/// A movement of funds between two accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: i64,
    pub from_account_id: i64,
    pub to_account_id: i64,
    /// Always positive, in minor units
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// Input of the transfer engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTxParams {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
}

impl TransferTxParams {
    pub fn new(from_account_id: i64, to_account_id: i64, amount: i64) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount,
        }
    }

    /// Reject requests that can never succeed, before touching storage
    pub fn validate(&self) -> Result<()> {
        if self.amount <= 0 {
            return Err(Error::invalid_argument(format!(
                "transfer amount must be positive, got {}",
                self.amount
            )));
        }
        if self.from_account_id == self.to_account_id {
            return Err(Error::invalid_argument(format!(
                "cannot transfer from account {} to itself",
                self.from_account_id
            )));
        }
        Ok(())
    }
}

/// Everything a committed transfer produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTxResult {
    pub transfer: Transfer,
    pub from_account: Account,
    pub to_account: Account,
    pub from_entry: Entry,
    pub to_entry: Entry,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::result::ErrorKind;

    #[test]
    fn test_validate_accepts_regular_transfer() {
        assert!(TransferTxParams::new(1, 2, 300).validate().is_ok());
        assert!(TransferTxParams::new(9, 2, 1).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_positive_amount() {
        for amount in [0, -1, i64::MIN] {
            let err = TransferTxParams::new(1, 2, amount).validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
    }

    #[test]
    fn test_validate_rejects_self_transfer() {
        let err = TransferTxParams::new(7, 7, 100).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("itself"));
    }
}
