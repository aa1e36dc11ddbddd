//! Ledger accounts and their record counters.

use std::fmt;

use kassa_shared::types::{AccountId, PeriodId};
use serde::{Deserialize, Serialize};

use super::record::RecordStatus;

/// Account type in the chart of accounts.
///
/// Only `Result` accounts contribute to a period's `to_balance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Asset account.
    Asset,
    /// Capital account.
    Capital,
    /// Revenue account.
    Revenue,
    /// Result (profit and loss) account.
    Result,
    /// Balance sheet account.
    Balance,
    /// Suspense account for unresolved movements.
    Suspense,
}

impl AccountType {
    /// Returns the string representation of the type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Capital => "capital",
            Self::Revenue => "revenue",
            Self::Result => "result",
            Self::Balance => "balance",
            Self::Suspense => "suspense",
        }
    }

    /// Parses a type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asset" => Some(Self::Asset),
            "capital" => Some(Self::Capital),
            "revenue" => Some(Self::Revenue),
            "result" => Some(Self::Result),
            "balance" => Some(Self::Balance),
            "suspense" => Some(Self::Suspense),
            _ => None,
        }
    }

    /// Returns true if records under this type feed the period balance.
    #[must_use]
    pub fn feeds_balance(&self) -> bool {
        matches!(self, Self::Result)
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of an account. Independent of the status of its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Records may be added.
    Open,
    /// Closed by the closing guard.
    Closed,
}

/// Denormalized record counters kept on accounts and periods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCounters {
    /// All records regardless of status.
    pub record_count: u64,
    /// Records that are neither approved nor closed.
    pub record_count_unapproved: u64,
    /// Records that are declined.
    pub record_count_declined: u64,
}

impl RecordCounters {
    /// Counts one record with the given status.
    pub fn observe(&mut self, status: RecordStatus) {
        self.record_count += 1;
        if status.is_unapproved() {
            self.record_count_unapproved += 1;
        }
        if status.is_declined() {
            self.record_count_declined += 1;
        }
    }

    /// Adds another set of counters to this one.
    pub fn absorb(&mut self, other: &Self) {
        self.record_count += other.record_count;
        self.record_count_unapproved += other.record_count_unapproved;
        self.record_count_declined += other.record_count_declined;
    }

    /// Counts an iterator of statuses from scratch.
    pub fn tally<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = RecordStatus>,
    {
        let mut counters = Self::default();
        for status in statuses {
            counters.observe(status);
        }
        counters
    }
}

/// A ledger account, child of exactly one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Owning period.
    pub period_id: PeriodId,
    /// Ledger code (e.g. "102"), unique within the period.
    pub ledger_code: String,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Account type.
    #[serde(rename = "type")]
    pub account_type: AccountType,
    /// Current status.
    pub status: AccountStatus,
    /// Derived counters, owned by the aggregate maintainer.
    #[serde(flatten)]
    pub counters: RecordCounters,
}

impl Account {
    /// Returns true if the account accepts new records.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == AccountStatus::Open
    }
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Owning period.
    pub period_id: PeriodId,
    /// Ledger code, unique within the period.
    pub ledger_code: String,
    /// Display title.
    pub title: String,
    /// Account type.
    pub account_type: AccountType,
}

impl NewAccount {
    /// Creates an account input with an empty title.
    pub fn new(
        period_id: PeriodId,
        ledger_code: impl Into<String>,
        account_type: AccountType,
    ) -> Self {
        Self {
            period_id,
            ledger_code: ledger_code.into(),
            title: String::new(),
            account_type,
        }
    }

    /// Sets the display title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}
