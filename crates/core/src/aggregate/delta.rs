//! Signed counter deltas used by incremental bumps.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::{AccountType, Movement, PeriodTotals, RecordCounters, RecordStatus};

/// A named aggregate counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    /// `record_count`.
    RecordCount,
    /// `record_count_unapproved`.
    RecordCountUnapproved,
    /// `record_count_declined`.
    RecordCountDeclined,
    /// `account_count` (period scope only).
    AccountCount,
}

impl Counter {
    /// Field name as stored.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RecordCount => "record_count",
            Self::RecordCountUnapproved => "record_count_unapproved",
            Self::RecordCountDeclined => "record_count_declined",
            Self::AccountCount => "account_count",
        }
    }
}

/// Signed adjustments to every aggregate at once.
///
/// At account scope `account_count` and `to_balance` are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterDelta {
    /// Change to `record_count`.
    pub record_count: i64,
    /// Change to `record_count_unapproved`.
    pub record_count_unapproved: i64,
    /// Change to `record_count_declined`.
    pub record_count_declined: i64,
    /// Change to `account_count`.
    pub account_count: i64,
    /// Change to `to_balance`.
    pub to_balance: Decimal,
}

fn indicator(flag: bool) -> i64 {
    i64::from(flag)
}

impl CounterDelta {
    /// A delta touching a single counter.
    #[must_use]
    pub fn single(counter: Counter, amount: i64) -> Self {
        let mut delta = Self::default();
        match counter {
            Counter::RecordCount => delta.record_count = amount,
            Counter::RecordCountUnapproved => delta.record_count_unapproved = amount,
            Counter::RecordCountDeclined => delta.record_count_declined = amount,
            Counter::AccountCount => delta.account_count = amount,
        }
        delta
    }

    /// Delta for a record moving from one status to another.
    ///
    /// The balance never changes on a status change.
    #[must_use]
    pub fn for_status_change(from: RecordStatus, to: RecordStatus) -> Self {
        Self {
            record_count_unapproved: indicator(to.is_unapproved())
                - indicator(from.is_unapproved()),
            record_count_declined: indicator(to.is_declined()) - indicator(from.is_declined()),
            ..Self::default()
        }
    }

    /// Delta for a new record.
    #[must_use]
    pub fn for_insert(status: RecordStatus, balance: Decimal) -> Self {
        Self {
            record_count: 1,
            record_count_unapproved: indicator(status.is_unapproved()),
            record_count_declined: indicator(status.is_declined()),
            account_count: 0,
            to_balance: balance,
        }
    }

    /// Delta for a removed record.
    #[must_use]
    pub fn for_removal(status: RecordStatus, balance: Decimal) -> Self {
        Self::for_insert(status, balance).negated()
    }

    /// Delta taking record counters from `from` to `to`.
    #[must_use]
    pub fn between(from: &RecordCounters, to: &RecordCounters) -> Self {
        Self {
            record_count: difference(from.record_count, to.record_count),
            record_count_unapproved: difference(
                from.record_count_unapproved,
                to.record_count_unapproved,
            ),
            record_count_declined: difference(
                from.record_count_declined,
                to.record_count_declined,
            ),
            ..Self::default()
        }
    }

    /// Delta for a new account.
    #[must_use]
    pub fn account_added() -> Self {
        Self::single(Counter::AccountCount, 1)
    }

    /// Delta for a removed account.
    #[must_use]
    pub fn account_removed() -> Self {
        Self::single(Counter::AccountCount, -1)
    }

    /// Contribution of a movement to the period balance.
    #[must_use]
    pub fn balance_of(account_type: AccountType, movement: &Movement) -> Decimal {
        if account_type.feeds_balance() {
            movement.signed()
        } else {
            Decimal::ZERO
        }
    }

    /// The inverse delta.
    #[must_use]
    pub fn negated(&self) -> Self {
        Self {
            record_count: -self.record_count,
            record_count_unapproved: -self.record_count_unapproved,
            record_count_declined: -self.record_count_declined,
            account_count: -self.account_count,
            to_balance: -self.to_balance,
        }
    }

    /// True if applying the delta changes nothing.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the record part of the delta to account counters.
    ///
    /// Counters never go below zero; returns true if any counter had to be
    /// clamped, which means the stored counters had drifted.
    pub fn apply_to_counters(&self, counters: &mut RecordCounters) -> bool {
        let mut clamped = false;
        clamped |= shift(&mut counters.record_count, self.record_count);
        clamped |= shift(
            &mut counters.record_count_unapproved,
            self.record_count_unapproved,
        );
        clamped |= shift(
            &mut counters.record_count_declined,
            self.record_count_declined,
        );
        clamped
    }

    /// Applies the whole delta to period totals. Returns true if clamped.
    pub fn apply_to_totals(&self, totals: &mut PeriodTotals) -> bool {
        let mut clamped = self.apply_to_counters(&mut totals.records);
        clamped |= shift(&mut totals.account_count, self.account_count);
        totals.to_balance += self.to_balance;
        clamped
    }
}

fn difference(from: u64, to: u64) -> i64 {
    let from = i64::try_from(from).unwrap_or(i64::MAX);
    let to = i64::try_from(to).unwrap_or(i64::MAX);
    to.saturating_sub(from)
}

fn shift(value: &mut u64, delta: i64) -> bool {
    match value.checked_add_signed(delta) {
        Some(next) => {
            *value = next;
            false
        }
        None => {
            *value = 0;
            true
        }
    }
}
