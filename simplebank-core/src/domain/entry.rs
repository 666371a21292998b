//! Ledger entry domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One side of a transfer, as recorded against a single account
///
/// Entries are an append-only audit trail. Creating one never moves money;
/// the balance change is applied separately by the balance adjuster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub account_id: i64,
    /// Signed delta in minor units: negative for the source, positive for the destination
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}
