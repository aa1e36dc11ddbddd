//! Ancestor resolution with a bounded cache.
//!
//! Lineages are derived from stored parent links only. Records are never
//! re-parented, so a resolved lineage stays valid until the entity is
//! deleted.

use std::time::Duration;

use kassa_shared::config::HierarchyConfig;
use kassa_shared::types::{AccountId, PeriodId, RecordId};
use moka::sync::Cache;
use tracing::debug;

use crate::error::LedgerError;
use crate::store::EntityStore;

/// Default cache capacity (number of entries per level).
const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// Default time-to-live for cache entries (1 hour).
const DEFAULT_TTL_SECS: u64 = 3600;

/// The ancestors of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lineage {
    /// Owning account.
    pub account_id: AccountId,
    /// Owning period.
    pub period_id: PeriodId,
}

/// Resolves and caches record and account ancestry.
#[derive(Clone)]
pub struct HierarchyResolver {
    records: Cache<RecordId, Lineage>,
    accounts: Cache<AccountId, PeriodId>,
}

impl HierarchyResolver {
    /// Creates a resolver with default settings.
    ///
    /// Default: 10 000 entries per level, 1 hour TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_CACHE_CAPACITY, DEFAULT_TTL_SECS)
    }

    /// Creates a resolver with custom cache bounds.
    #[must_use]
    pub fn with_config(max_capacity: u64, ttl_secs: u64) -> Self {
        let ttl = Duration::from_secs(ttl_secs);
        Self {
            records: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
            accounts: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Creates a resolver from application configuration.
    #[must_use]
    pub fn from_config(config: &HierarchyConfig) -> Self {
        Self::with_config(config.cache_capacity, config.cache_ttl_secs)
    }

    /// Finds the period an account belongs to.
    pub fn resolve_account<S>(
        &self,
        store: &S,
        account_id: AccountId,
    ) -> Result<PeriodId, LedgerError>
    where
        S: EntityStore + ?Sized,
    {
        if let Some(period_id) = self.accounts.get(&account_id) {
            return Ok(period_id);
        }

        let account = store
            .account(account_id)?
            .ok_or(LedgerError::AccountNotFound(account_id))?;
        self.accounts.insert(account_id, account.period_id);
        debug!(%account_id, period_id = %account.period_id, "Resolved account lineage");
        Ok(account.period_id)
    }

    /// Finds the account and period a record belongs to.
    ///
    /// The period is taken from the account, which is authoritative over the
    /// record's denormalized `period_id`.
    pub fn resolve_record<S>(&self, store: &S, record_id: RecordId) -> Result<Lineage, LedgerError>
    where
        S: EntityStore + ?Sized,
    {
        if let Some(lineage) = self.records.get(&record_id) {
            return Ok(lineage);
        }

        let record = store
            .record(record_id)?
            .ok_or(LedgerError::RecordNotFound(record_id))?;
        let lineage = Lineage {
            account_id: record.account_id,
            period_id: self.resolve_account(store, record.account_id)?,
        };
        self.records.insert(record_id, lineage);
        Ok(lineage)
    }

    /// Lineage for a record about to be created under `account_id`.
    ///
    /// An explicit `period_id` must agree with the account's period.
    pub fn lineage_for_new<S>(
        &self,
        store: &S,
        account_id: AccountId,
        period_id: Option<PeriodId>,
    ) -> Result<Lineage, LedgerError>
    where
        S: EntityStore + ?Sized,
    {
        let actual = self.resolve_account(store, account_id)?;
        match period_id {
            Some(requested) if requested != actual => Err(LedgerError::HierarchyMismatch {
                account_id,
                requested,
                actual,
            }),
            _ => Ok(Lineage {
                account_id,
                period_id: actual,
            }),
        }
    }

    /// Remembers a freshly created record.
    pub fn remember_record(&self, record_id: RecordId, lineage: Lineage) {
        self.records.insert(record_id, lineage);
    }

    /// Drops a deleted record.
    pub fn forget_record(&self, record_id: RecordId) {
        self.records.invalidate(&record_id);
    }

    /// Drops a deleted account.
    pub fn forget_account(&self, account_id: AccountId) {
        self.accounts.invalidate(&account_id);
    }

    /// Drops everything, e.g. after a cascading delete.
    pub fn clear(&self) {
        self.records.invalidate_all();
        self.accounts.invalidate_all();
    }
}

impl Default for HierarchyResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HierarchyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HierarchyResolver")
            .field("records", &self.records.entry_count())
            .field("accounts", &self.accounts.entry_count())
            .finish()
    }
}
