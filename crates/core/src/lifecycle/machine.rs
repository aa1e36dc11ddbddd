//! Record status state machine.
//!
//! Pure functions over [`RecordStatus`]; nothing here touches storage.

use serde::{Deserialize, Serialize};

use crate::authz::RecordAction;
use crate::lifecycle::error::TransitionError;
use crate::model::RecordStatus;

/// A requested record status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordTransition {
    /// Published or Approved → Declined.
    Decline,
    /// Published or Declined → Approved.
    Approve,
    /// Approved → Closed.
    Close,
}

impl RecordTransition {
    /// Status the record ends in.
    #[must_use]
    pub fn target(&self) -> RecordStatus {
        match self {
            Self::Decline => RecordStatus::Declined,
            Self::Approve => RecordStatus::Approved,
            Self::Close => RecordStatus::Closed,
        }
    }

    /// The action checked with the authorizer.
    #[must_use]
    pub fn action(&self) -> RecordAction {
        match self {
            Self::Decline => RecordAction::Decline,
            Self::Approve => RecordAction::Approve,
            Self::Close => RecordAction::Close,
        }
    }
}

/// Stateless record lifecycle rules.
pub struct RecordLifecycle;

impl RecordLifecycle {
    /// Decline a published or approved record.
    ///
    /// # Returns
    /// * `Ok(Declined)` if the transition is valid
    /// * `Err(AlreadyInState)` if already declined
    /// * `Err(NotAllowed)` if closed
    pub fn decline(current: RecordStatus) -> Result<RecordStatus, TransitionError> {
        Self::apply(current, RecordTransition::Decline)
    }

    /// Approve a published or declined record.
    pub fn approve(current: RecordStatus) -> Result<RecordStatus, TransitionError> {
        Self::apply(current, RecordTransition::Approve)
    }

    /// Close an approved record. Closed is terminal.
    pub fn close(current: RecordStatus) -> Result<RecordStatus, TransitionError> {
        Self::apply(current, RecordTransition::Close)
    }

    /// Applies a transition to the current status.
    pub fn apply(
        current: RecordStatus,
        transition: RecordTransition,
    ) -> Result<RecordStatus, TransitionError> {
        let target = transition.target();
        if current == target {
            return Err(TransitionError::AlreadyInState(current));
        }
        if Self::is_valid_transition(current, target) {
            Ok(target)
        } else {
            Err(TransitionError::NotAllowed {
                from: current,
                to: target,
            })
        }
    }

    /// Check if a status transition is valid.
    #[must_use]
    pub fn is_valid_transition(from: RecordStatus, to: RecordStatus) -> bool {
        matches!(
            (from, to),
            (
                RecordStatus::Published | RecordStatus::Approved,
                RecordStatus::Declined
            ) | (
                RecordStatus::Published | RecordStatus::Declined,
                RecordStatus::Approved
            ) | (RecordStatus::Approved, RecordStatus::Closed)
        )
    }
}
