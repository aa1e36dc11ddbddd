//! Ledger entities: periods, accounts and records.
//!
//! The hierarchy is strictly three levels deep. A period owns its accounts,
//! an account owns its records, and every record also carries the id of the
//! period it belongs to.

pub mod account;
pub mod period;
pub mod record;

use std::fmt;

use kassa_shared::types::{AccountId, PeriodId, RecordId};
use serde::{Deserialize, Serialize};

pub use account::{Account, AccountStatus, AccountType, NewAccount, RecordCounters};
pub use period::{Period, PeriodStatus, PeriodTotals};
pub use record::{Movement, NewRecord, Record, RecordEdit, RecordStatus, ValueType};

/// A reference to any entity in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum EntityRef {
    /// A period.
    Period(PeriodId),
    /// An account.
    Account(AccountId),
    /// A record.
    Record(RecordId),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Period(id) => write!(f, "period {id}"),
            Self::Account(id) => write!(f, "account {id}"),
            Self::Record(id) => write!(f, "record {id}"),
        }
    }
}
