//! Record Lifecycle Engine.
//!
//! - `machine`: pure status transition rules
//! - `engine`: record operations on [`crate::service::LedgerService`]

pub mod engine;
pub mod error;
pub mod machine;

#[cfg(test)]
mod machine_props;

pub use error::TransitionError;
pub use machine::{RecordLifecycle, RecordTransition};
