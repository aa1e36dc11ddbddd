//! Entity store seam.
//!
//! The ledger is storage agnostic. Anything that can keep periods, accounts
//! and records with their ancestor links, and apply counter deltas atomically
//! per entity, can back it. [`MemoryStore`] is the in-process implementation.

pub mod error;
pub mod memory;
pub mod snapshot;

use chrono::{DateTime, Utc};
use kassa_shared::types::{AccountId, PeriodId, RecordId};

use crate::aggregate::CounterDelta;
use crate::model::{
    Account, AccountStatus, Period, PeriodStatus, PeriodTotals, Record, RecordCounters,
    RecordStatus,
};

pub use error::StoreError;
pub use memory::MemoryStore;
pub use snapshot::LedgerSnapshot;

/// Filter for record listings. Unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Owning account.
    pub account_id: Option<AccountId>,
    /// Owning period (denormalized link).
    pub period_id: Option<PeriodId>,
    /// Record status.
    pub status: Option<RecordStatus>,
}

impl RecordFilter {
    /// Records under an account.
    #[must_use]
    pub fn by_account(account_id: AccountId) -> Self {
        Self {
            account_id: Some(account_id),
            ..Self::default()
        }
    }

    /// Records linked to a period.
    #[must_use]
    pub fn by_period(period_id: PeriodId) -> Self {
        Self {
            period_id: Some(period_id),
            ..Self::default()
        }
    }

    /// Restricts to one status.
    #[must_use]
    pub fn with_status(mut self, status: RecordStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Returns true if the record passes the filter.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.account_id.is_none_or(|id| record.account_id == id)
            && self.period_id.is_none_or(|id| record.period_id == id)
            && self.status.is_none_or(|status| record.status == status)
    }
}

/// Durable storage for ledger entities.
///
/// Counter adjustments must be atomic per entity: two concurrent
/// `adjust_*` calls on the same account or period must both be applied.
/// Record status writes are compare-and-set on [`Record::version`].
pub trait EntityStore: Send + Sync {
    /// Fetches a period.
    fn period(&self, id: PeriodId) -> Result<Option<Period>, StoreError>;
    /// Fetches an account.
    fn account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;
    /// Fetches a record.
    fn record(&self, id: RecordId) -> Result<Option<Record>, StoreError>;

    /// Inserts a new period.
    fn insert_period(&self, period: Period) -> Result<(), StoreError>;
    /// Inserts a new account.
    fn insert_account(&self, account: Account) -> Result<(), StoreError>;
    /// Inserts a new record.
    fn insert_record(&self, record: Record) -> Result<(), StoreError>;

    /// Lists periods, optionally by status.
    fn list_periods(&self, status: Option<PeriodStatus>) -> Result<Vec<Period>, StoreError>;
    /// Lists the accounts of a period, optionally by status.
    fn list_accounts(
        &self,
        period_id: PeriodId,
        status: Option<AccountStatus>,
    ) -> Result<Vec<Account>, StoreError>;
    /// Lists every account, whatever its period, ordered by id.
    fn list_all_accounts(&self) -> Result<Vec<Account>, StoreError>;
    /// Lists records matching the filter.
    fn list_records(&self, filter: &RecordFilter) -> Result<Vec<Record>, StoreError>;

    /// Writes a period's status fields.
    fn update_period_status(
        &self,
        id: PeriodId,
        status: PeriodStatus,
        closed_at: Option<DateTime<Utc>>,
        status_before_close: Option<PeriodStatus>,
    ) -> Result<Period, StoreError>;
    /// Writes an account's status.
    fn update_account_status(
        &self,
        id: AccountId,
        status: AccountStatus,
    ) -> Result<Account, StoreError>;
    /// Writes a record's status if its version still equals `expected_version`.
    fn update_record_status(
        &self,
        id: RecordId,
        expected_version: u64,
        status: RecordStatus,
    ) -> Result<Record, StoreError>;
    /// Writes a record's editable details if its version still equals `expected_version`.
    fn update_record_details(
        &self,
        id: RecordId,
        expected_version: u64,
        memo: String,
        offset_account: Option<AccountId>,
    ) -> Result<Record, StoreError>;

    /// Atomically adds a delta to an account's counters.
    fn adjust_account_counters(
        &self,
        id: AccountId,
        delta: &CounterDelta,
    ) -> Result<Account, StoreError>;
    /// Atomically adds a delta to a period's totals.
    fn adjust_period_counters(
        &self,
        id: PeriodId,
        delta: &CounterDelta,
    ) -> Result<Period, StoreError>;
    /// Overwrites an account's counters, returning the ones replaced.
    fn write_account_counters(
        &self,
        id: AccountId,
        counters: RecordCounters,
    ) -> Result<RecordCounters, StoreError>;
    /// Overwrites a period's totals.
    fn write_period_totals(&self, id: PeriodId, totals: PeriodTotals) -> Result<(), StoreError>;

    /// Deletes a record, returning it.
    fn delete_record(&self, id: RecordId) -> Result<Record, StoreError>;
    /// Deletes an account. Without `cascade`, fails if it has records.
    /// Returns the number of records removed.
    fn delete_account(&self, id: AccountId, cascade: bool) -> Result<usize, StoreError>;
    /// Deletes a period. Without `cascade`, fails if it has accounts.
    /// Returns the number of accounts removed.
    fn delete_period(&self, id: PeriodId, cascade: bool) -> Result<usize, StoreError>;
}
