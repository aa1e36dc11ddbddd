//! Recount and audit results.

use kassa_shared::types::{AccountId, PeriodId, RecordId};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::model::{EntityRef, PeriodTotals, RecordCounters};

/// An entity skipped or flagged during a recount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum RecountIssue {
    /// The record points to an account that does not exist; it was skipped.
    OrphanRecord {
        /// The record.
        record_id: RecordId,
        /// The missing account.
        account_id: AccountId,
    },
    /// The account points to a period that does not exist; it was skipped
    /// along with its records.
    OrphanAccount {
        /// The account.
        account_id: AccountId,
        /// The missing period.
        period_id: PeriodId,
    },
    /// The record's denormalized period differs from its account's period.
    /// It was counted under the account's period.
    PeriodMismatch {
        /// The record.
        record_id: RecordId,
        /// Period stored on the record.
        recorded: PeriodId,
        /// Period of the owning account.
        actual: PeriodId,
    },
}

/// Counters recomputed for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountRecount {
    /// The account.
    pub account_id: AccountId,
    /// Counters written.
    pub counters: RecordCounters,
    /// Contribution of the account to its period's balance.
    pub balance: Decimal,
    /// Records flagged while counting.
    pub issues: Vec<RecountIssue>,
}

/// Totals recomputed for one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecountReport {
    /// The period.
    pub period_id: PeriodId,
    /// Totals written.
    pub totals: PeriodTotals,
    /// Per-account results.
    pub accounts: Vec<AccountRecount>,
    /// Every issue found, accounts included.
    pub issues: Vec<RecountIssue>,
}

/// Result of recounting every period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FullRecount {
    /// One report per period.
    pub periods: Vec<RecountReport>,
    /// Orphan accounts, and orphan records whose period does not exist either.
    pub unreachable: Vec<RecountIssue>,
}

impl FullRecount {
    /// Number of issues across all periods.
    #[must_use]
    pub fn issue_count(&self) -> usize {
        self.periods.iter().map(|p| p.issues.len()).sum::<usize>() + self.unreachable.len()
    }
}

/// A stored aggregate that disagrees with a fresh recount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Drift {
    /// The account or period.
    pub entity: EntityRef,
    /// Field name.
    pub field: &'static str,
    /// Stored value.
    pub stored: Decimal,
    /// Recounted value.
    pub recounted: Decimal,
}

impl Drift {
    /// Compares record counters field by field.
    pub(crate) fn between_counters(
        entity: EntityRef,
        stored: &RecordCounters,
        recounted: &RecordCounters,
    ) -> Vec<Self> {
        [
            ("record_count", stored.record_count, recounted.record_count),
            (
                "record_count_unapproved",
                stored.record_count_unapproved,
                recounted.record_count_unapproved,
            ),
            (
                "record_count_declined",
                stored.record_count_declined,
                recounted.record_count_declined,
            ),
        ]
        .into_iter()
        .filter(|(_, stored, recounted)| stored != recounted)
        .map(|(field, stored, recounted)| Self {
            entity,
            field,
            stored: Decimal::from(stored),
            recounted: Decimal::from(recounted),
        })
        .collect()
    }

    /// Compares period totals field by field.
    pub(crate) fn between_totals(
        period_id: PeriodId,
        stored: &PeriodTotals,
        recounted: &PeriodTotals,
    ) -> Vec<Self> {
        let entity = EntityRef::Period(period_id);
        let mut drift = Self::between_counters(entity, &stored.records, &recounted.records);
        if stored.account_count != recounted.account_count {
            drift.push(Self {
                entity,
                field: "account_count",
                stored: Decimal::from(stored.account_count),
                recounted: Decimal::from(recounted.account_count),
            });
        }
        if stored.to_balance != recounted.to_balance {
            drift.push(Self {
                entity,
                field: "to_balance",
                stored: stored.to_balance,
                recounted: recounted.to_balance,
            });
        }
        drift
    }
}
