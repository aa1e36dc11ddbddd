//! Record transition errors.

use kassa_shared::types::RecordId;
use thiserror::Error;

use crate::model::{EntityRef, RecordStatus};
use crate::outcome::Refusal;

/// Why the state machine rejected a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The record already has the target status.
    #[error("Record is already {0}")]
    AlreadyInState(RecordStatus),

    /// The transition is not in the table.
    #[error("Invalid status transition from {from} to {to}")]
    NotAllowed {
        /// The current status.
        from: RecordStatus,
        /// The attempted target status.
        to: RecordStatus,
    },
}

impl TransitionError {
    /// Converts into the refusal reported for `record_id`.
    #[must_use]
    pub fn into_refusal(self, record_id: RecordId) -> Refusal {
        match self {
            Self::AlreadyInState(_) => Refusal::Unchanged(EntityRef::Record(record_id)),
            Self::NotAllowed { from, to } => Refusal::InvalidTransition { record_id, from, to },
        }
    }
}
