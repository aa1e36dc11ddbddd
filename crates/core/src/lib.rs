//! Core ledger logic for Kassa.
//!
//! This crate keeps a three-level ledger (period, account, record) with a
//! per-record approval workflow and denormalized counters at every ancestor
//! level. It has ZERO web or database dependencies; storage is reached
//! through the [`store::EntityStore`] trait.
//!
//! # Modules
//!
//! - `model` - Periods, accounts, records and their statuses
//! - `lifecycle` - Record status state machine and record operations
//! - `aggregate` - Incremental bumps and authoritative recounts
//! - `closing` - Closing Guard for accounts and periods
//! - `hierarchy` - Cached record and account ancestry
//! - `authz` - Capability checks before every mutation
//! - `store` - Entity store trait, in-memory store and snapshots
//! - `service` - `LedgerService`, the entry point

pub mod aggregate;
pub mod authz;
pub mod closing;
pub mod error;
pub mod hierarchy;
pub mod lifecycle;
pub mod model;
pub mod outcome;
pub mod service;
pub mod store;

pub use error::LedgerError;
pub use outcome::{Outcome, Refusal};
pub use service::{AccountSummary, LedgerService, PeriodSummary};
