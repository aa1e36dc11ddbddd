//! Whole-ledger snapshots for bulk import and repair tooling.
//!
//! Loading a snapshot inserts rows as they are, counters included. Imported
//! counters are not trusted: run a full recount after loading.

use serde::{Deserialize, Serialize};

use super::error::StoreError;
use super::memory::MemoryStore;
use super::{EntityStore, RecordFilter};
use crate::model::{Account, Period, Record};

/// Every entity of a ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Periods with their stored totals.
    #[serde(default)]
    pub periods: Vec<Period>,
    /// Accounts with their stored counters.
    #[serde(default)]
    pub accounts: Vec<Account>,
    /// Records.
    #[serde(default)]
    pub records: Vec<Record>,
}

impl LedgerSnapshot {
    /// Parses a JSON snapshot.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes the snapshot as pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl MemoryStore {
    /// Builds a store from a snapshot without touching any counter.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Result<Self, StoreError> {
        let store = Self::new();
        for period in snapshot.periods {
            store.insert_period(period)?;
        }
        for account in snapshot.accounts {
            store.insert_account(account)?;
        }
        for record in snapshot.records {
            store.insert_record(record)?;
        }
        Ok(store)
    }

    /// Captures the current state, ordered by id.
    pub fn snapshot(&self) -> Result<LedgerSnapshot, StoreError> {
        let periods = self.list_periods(None)?;
        let accounts = self.list_all_accounts()?;
        let records = self.list_records(&RecordFilter::default())?;
        Ok(LedgerSnapshot {
            periods,
            accounts,
            records,
        })
    }
}
