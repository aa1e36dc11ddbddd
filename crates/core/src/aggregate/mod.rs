//! Aggregate Maintainer.
//!
//! Keeps `record_count`, `record_count_unapproved`, `record_count_declined`,
//! `account_count` and `to_balance` on accounts and periods, either by
//! incremental bump or by authoritative recount.

pub mod delta;
pub mod maintainer;
pub mod report;

#[cfg(test)]
mod maintainer_props;

pub use delta::{Counter, CounterDelta};
pub use maintainer::AggregateMaintainer;
pub use report::{AccountRecount, Drift, FullRecount, RecountIssue, RecountReport};
