//! In-memory entity store backed by `DashMap`.
//!
//! Each map shard is guarded by its own lock, so counter adjustments on one
//! account or period are serialized while unrelated entities proceed in
//! parallel. Never hold a reference into one map while touching the same
//! map again.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use kassa_shared::types::{AccountId, PeriodId, RecordId};
use tracing::warn;

use super::error::StoreError;
use super::{EntityStore, RecordFilter};
use crate::aggregate::CounterDelta;
use crate::model::{
    Account, AccountStatus, EntityRef, Period, PeriodStatus, PeriodTotals, Record,
    RecordCounters, RecordStatus,
};

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    periods: DashMap<PeriodId, Period>,
    accounts: DashMap<AccountId, Account>,
    records: DashMap<RecordId, Record>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    #[must_use]
    pub fn record_len(&self) -> usize {
        self.records.len()
    }

    fn count_records_of(&self, account_id: AccountId) -> usize {
        self.records
            .iter()
            .filter(|entry| entry.account_id == account_id)
            .count()
    }

    fn check_version(record: &Record, expected: u64) -> Result<(), StoreError> {
        if record.version == expected {
            Ok(())
        } else {
            Err(StoreError::VersionConflict {
                record_id: record.id,
                expected,
                actual: record.version,
            })
        }
    }
}

impl EntityStore for MemoryStore {
    fn period(&self, id: PeriodId) -> Result<Option<Period>, StoreError> {
        Ok(self.periods.get(&id).map(|entry| entry.value().clone()))
    }

    fn account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(&id).map(|entry| entry.value().clone()))
    }

    fn record(&self, id: RecordId) -> Result<Option<Record>, StoreError> {
        Ok(self.records.get(&id).map(|entry| entry.value().clone()))
    }

    fn insert_period(&self, period: Period) -> Result<(), StoreError> {
        match self.periods.entry(period.id) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(EntityRef::Period(period.id))),
            Entry::Vacant(slot) => {
                slot.insert(period);
                Ok(())
            }
        }
    }

    fn insert_account(&self, account: Account) -> Result<(), StoreError> {
        match self.accounts.entry(account.id) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(EntityRef::Account(account.id))),
            Entry::Vacant(slot) => {
                slot.insert(account);
                Ok(())
            }
        }
    }

    fn insert_record(&self, record: Record) -> Result<(), StoreError> {
        match self.records.entry(record.id) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(EntityRef::Record(record.id))),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    fn list_periods(&self, status: Option<PeriodStatus>) -> Result<Vec<Period>, StoreError> {
        let mut periods: Vec<Period> = self
            .periods
            .iter()
            .filter(|entry| status.is_none_or(|s| entry.status == s))
            .map(|entry| entry.value().clone())
            .collect();
        periods.sort_by_key(|p| p.id);
        Ok(periods)
    }

    fn list_accounts(
        &self,
        period_id: PeriodId,
        status: Option<AccountStatus>,
    ) -> Result<Vec<Account>, StoreError> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .filter(|entry| entry.period_id == period_id)
            .filter(|entry| status.is_none_or(|s| entry.status == s))
            .map(|entry| entry.value().clone())
            .collect();
        accounts.sort_by_key(|a| a.id);
        Ok(accounts)
    }

    fn list_all_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        accounts.sort_by_key(|a| a.id);
        Ok(accounts)
    }

    fn list_records(&self, filter: &RecordFilter) -> Result<Vec<Record>, StoreError> {
        let mut records: Vec<Record> = self
            .records
            .iter()
            .filter(|entry| filter.matches(entry))
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    fn update_period_status(
        &self,
        id: PeriodId,
        status: PeriodStatus,
        closed_at: Option<DateTime<Utc>>,
        status_before_close: Option<PeriodStatus>,
    ) -> Result<Period, StoreError> {
        let mut period = self
            .periods
            .get_mut(&id)
            .ok_or(StoreError::Missing(EntityRef::Period(id)))?;
        period.status = status;
        period.closed_at = closed_at;
        period.status_before_close = status_before_close;
        Ok(period.clone())
    }

    fn update_account_status(
        &self,
        id: AccountId,
        status: AccountStatus,
    ) -> Result<Account, StoreError> {
        let mut account = self
            .accounts
            .get_mut(&id)
            .ok_or(StoreError::Missing(EntityRef::Account(id)))?;
        account.status = status;
        Ok(account.clone())
    }

    fn update_record_status(
        &self,
        id: RecordId,
        expected_version: u64,
        status: RecordStatus,
    ) -> Result<Record, StoreError> {
        let mut record = self
            .records
            .get_mut(&id)
            .ok_or(StoreError::Missing(EntityRef::Record(id)))?;
        Self::check_version(&record, expected_version)?;
        record.status = status;
        record.version += 1;
        Ok(record.clone())
    }

    fn update_record_details(
        &self,
        id: RecordId,
        expected_version: u64,
        memo: String,
        offset_account: Option<AccountId>,
    ) -> Result<Record, StoreError> {
        let mut record = self
            .records
            .get_mut(&id)
            .ok_or(StoreError::Missing(EntityRef::Record(id)))?;
        Self::check_version(&record, expected_version)?;
        record.memo = memo;
        record.offset_account = offset_account;
        record.version += 1;
        Ok(record.clone())
    }

    fn adjust_account_counters(
        &self,
        id: AccountId,
        delta: &CounterDelta,
    ) -> Result<Account, StoreError> {
        let mut account = self
            .accounts
            .get_mut(&id)
            .ok_or(StoreError::Missing(EntityRef::Account(id)))?;
        if delta.apply_to_counters(&mut account.counters) {
            warn!(account_id = %id, ?delta, "Account counter underflow clamped, recount advised");
        }
        Ok(account.clone())
    }

    fn adjust_period_counters(
        &self,
        id: PeriodId,
        delta: &CounterDelta,
    ) -> Result<Period, StoreError> {
        let mut period = self
            .periods
            .get_mut(&id)
            .ok_or(StoreError::Missing(EntityRef::Period(id)))?;
        if delta.apply_to_totals(&mut period.totals) {
            warn!(period_id = %id, ?delta, "Period counter underflow clamped, recount advised");
        }
        Ok(period.clone())
    }

    fn write_account_counters(
        &self,
        id: AccountId,
        counters: RecordCounters,
    ) -> Result<RecordCounters, StoreError> {
        let mut account = self
            .accounts
            .get_mut(&id)
            .ok_or(StoreError::Missing(EntityRef::Account(id)))?;
        Ok(std::mem::replace(&mut account.counters, counters))
    }

    fn write_period_totals(&self, id: PeriodId, totals: PeriodTotals) -> Result<(), StoreError> {
        let mut period = self
            .periods
            .get_mut(&id)
            .ok_or(StoreError::Missing(EntityRef::Period(id)))?;
        period.totals = totals;
        Ok(())
    }

    fn delete_record(&self, id: RecordId) -> Result<Record, StoreError> {
        self.records
            .remove(&id)
            .map(|(_, record)| record)
            .ok_or(StoreError::Missing(EntityRef::Record(id)))
    }

    fn delete_account(&self, id: AccountId, cascade: bool) -> Result<usize, StoreError> {
        if !self.accounts.contains_key(&id) {
            return Err(StoreError::Missing(EntityRef::Account(id)));
        }
        let children = self.count_records_of(id);
        if children > 0 && !cascade {
            return Err(StoreError::HasChildren(EntityRef::Account(id)));
        }
        self.records.retain(|_, record| record.account_id != id);
        self.accounts.remove(&id);
        Ok(children)
    }

    fn delete_period(&self, id: PeriodId, cascade: bool) -> Result<usize, StoreError> {
        if !self.periods.contains_key(&id) {
            return Err(StoreError::Missing(EntityRef::Period(id)));
        }
        let accounts: Vec<AccountId> = self
            .accounts
            .iter()
            .filter(|entry| entry.period_id == id)
            .map(|entry| entry.id)
            .collect();
        if !accounts.is_empty() && !cascade {
            return Err(StoreError::HasChildren(EntityRef::Period(id)));
        }
        for account_id in &accounts {
            self.delete_account(*account_id, true)?;
        }
        // Records linked to the period whose account lives elsewhere.
        self.records.retain(|_, record| record.period_id != id);
        self.periods.remove(&id);
        Ok(accounts.len())
    }
}
