//! Ledger periods (e.g. fiscal years).

use chrono::{DateTime, Utc};
use kassa_shared::types::PeriodId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::RecordCounters;

/// Status of a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodStatus {
    /// Accounts and records may be added.
    Open,
    /// Closed by the closing guard; `closed_at` is set.
    Closed,
}

/// Aggregates maintained at period scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodTotals {
    /// Number of accounts under the period.
    pub account_count: u64,
    /// Record counters over every descendant record.
    #[serde(flatten)]
    pub records: RecordCounters,
    /// Net signed total of records under result accounts.
    pub to_balance: Decimal,
}

/// A top-level ledger interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    /// Unique identifier.
    pub id: PeriodId,
    /// Display title (e.g. "FY2026").
    pub title: String,
    /// Current status.
    pub status: PeriodStatus,
    /// When the period was closed. Only set while closed.
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    /// Status recorded at the last close, restored on reopen.
    #[serde(default)]
    pub status_before_close: Option<PeriodStatus>,
    /// Derived totals, owned by the aggregate maintainer.
    #[serde(flatten)]
    pub totals: PeriodTotals,
}

impl Period {
    /// Creates an open period with zeroed totals.
    pub fn open(title: impl Into<String>) -> Self {
        Self {
            id: PeriodId::new(),
            title: title.into(),
            status: PeriodStatus::Open,
            closed_at: None,
            status_before_close: None,
            totals: PeriodTotals::default(),
        }
    }

    /// Returns true if the period accepts new accounts and records.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == PeriodStatus::Open
    }

    /// Shortcut for the unapproved record count.
    #[must_use]
    pub fn unapproved(&self) -> u64 {
        self.totals.records.record_count_unapproved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_period_starts_empty() {
        let period = Period::open("FY2026");
        assert!(period.is_open());
        assert!(period.closed_at.is_none());
        assert_eq!(period.totals, PeriodTotals::default());
        assert_eq!(period.unapproved(), 0);
    }
}
