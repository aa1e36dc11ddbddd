//! Typed results for operations that can be refused.
//!
//! A refusal is normal control flow: the caller asked for something the
//! current state does not allow, and nothing was written.

use std::fmt;

use kassa_shared::types::{ActorId, RecordId};

use crate::authz::Action;
use crate::model::{EntityRef, RecordStatus};

/// Result of a refusable operation.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The change was applied.
    Applied(T),
    /// The change was refused; no state was modified.
    Refused(Refusal),
}

impl<T> Outcome<T> {
    /// Returns true if the change was applied.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    /// Returns true if the change was refused.
    pub fn is_refused(&self) -> bool {
        matches!(self, Self::Refused(_))
    }

    /// The applied value, if any.
    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            Self::Refused(_) => None,
        }
    }

    /// The refusal, if any.
    pub fn refusal(&self) -> Option<&Refusal> {
        match self {
            Self::Applied(_) => None,
            Self::Refused(refusal) => Some(refusal),
        }
    }

    /// Maps the applied value.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Self::Applied(value) => Outcome::Applied(f(value)),
            Self::Refused(refusal) => Outcome::Refused(refusal),
        }
    }
}

/// Why an operation was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refusal {
    /// The entity is already in the requested state.
    Unchanged(EntityRef),

    /// The record status does not allow the transition.
    InvalidTransition {
        /// The record.
        record_id: RecordId,
        /// Current status.
        from: RecordStatus,
        /// Requested status.
        to: RecordStatus,
    },

    /// Unapproved records remain under the entity being closed.
    BlockedByUnapproved {
        /// The account or period.
        entity: EntityRef,
        /// Unapproved records found.
        unapproved: u64,
    },

    /// The owning account or period is closed.
    ParentClosed(EntityRef),

    /// The record is closed and can no longer be edited or deleted.
    RecordClosed(RecordId),

    /// The authorizer denied the action.
    Forbidden {
        /// The actor.
        actor: ActorId,
        /// The denied action.
        action: Action,
    },

    /// The record changed concurrently; re-read and retry.
    Conflict(RecordId),

    /// The entity still has children.
    HasDescendants {
        /// The account or period.
        entity: EntityRef,
        /// Number of direct children.
        count: u64,
    },
}

impl Refusal {
    /// Returns a stable code for callers.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unchanged(_) => "UNCHANGED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::BlockedByUnapproved { .. } => "BLOCKED_BY_UNAPPROVED",
            Self::ParentClosed(_) => "PARENT_CLOSED",
            Self::RecordClosed(_) => "RECORD_CLOSED",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::Conflict(_) => "CONFLICT",
            Self::HasDescendants { .. } => "HAS_DESCENDANTS",
        }
    }

    /// Human-readable explanation suitable for end users.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Unchanged(entity) => format!("{entity} is already in the requested state"),
            Self::InvalidTransition { from, to, .. } => {
                format!("cannot move a {from} record to {to}")
            }
            Self::BlockedByUnapproved { unapproved: 1, .. } => {
                "cannot close: 1 unapproved record remains".to_string()
            }
            Self::BlockedByUnapproved { unapproved, .. } => {
                format!("cannot close: {unapproved} unapproved records remain")
            }
            Self::ParentClosed(entity) => format!("{entity} is closed"),
            Self::RecordClosed(_) => "closed records cannot be changed".to_string(),
            Self::Forbidden { action, .. } => format!("not allowed to {action}"),
            Self::Conflict(_) => "the record was changed by someone else, try again".to_string(),
            Self::HasDescendants { entity, count } => {
                format!("{entity} still has {count} children")
            }
        }
    }
}

impl fmt::Display for Refusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}
