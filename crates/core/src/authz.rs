//! Capability checks consulted before every mutation.
//!
//! Actions form a closed set per entity type. Policies match on them
//! exhaustively, so adding an action forces every policy to decide on it.

use std::collections::HashMap;
use std::fmt;

use kassa_shared::types::ActorId;
use serde::{Deserialize, Serialize};

use crate::model::EntityRef;

/// Actions on records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordAction {
    /// Create a record under an account.
    Create,
    /// Decline a record.
    Decline,
    /// Approve a record.
    Approve,
    /// Close an approved record.
    Close,
    /// Change memo or offset account.
    Edit,
    /// Delete a record.
    Delete,
}

/// Actions on accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountAction {
    /// Create an account under a period.
    Create,
    /// Close an account.
    Close,
    /// Reopen a closed account.
    Reopen,
    /// Delete an empty account.
    Delete,
}

/// Actions on periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodAction {
    /// Create a period.
    Create,
    /// Close a period.
    Close,
    /// Reopen a closed period.
    Reopen,
    /// Delete a period.
    Delete,
}

/// Any action the ledger performs on behalf of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "entity", content = "action", rename_all = "lowercase")]
pub enum Action {
    /// Record action.
    Record(RecordAction),
    /// Account action.
    Account(AccountAction),
    /// Period action.
    Period(PeriodAction),
}

impl Action {
    /// Returns the string representation of the action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Record(RecordAction::Create) => "record.create",
            Self::Record(RecordAction::Decline) => "record.decline",
            Self::Record(RecordAction::Approve) => "record.approve",
            Self::Record(RecordAction::Close) => "record.close",
            Self::Record(RecordAction::Edit) => "record.edit",
            Self::Record(RecordAction::Delete) => "record.delete",
            Self::Account(AccountAction::Create) => "account.create",
            Self::Account(AccountAction::Close) => "account.close",
            Self::Account(AccountAction::Reopen) => "account.reopen",
            Self::Account(AccountAction::Delete) => "account.delete",
            Self::Period(PeriodAction::Create) => "period.create",
            Self::Period(PeriodAction::Close) => "period.close",
            Self::Period(PeriodAction::Reopen) => "period.reopen",
            Self::Period(PeriodAction::Delete) => "period.delete",
        }
    }

    /// The lowest role allowed to perform this action under [`RolePolicy`].
    #[must_use]
    pub fn minimum_role(&self) -> Role {
        match self {
            Self::Record(RecordAction::Create | RecordAction::Edit | RecordAction::Delete)
            | Self::Account(AccountAction::Create | AccountAction::Delete) => Role::Bookkeeper,
            Self::Record(RecordAction::Decline | RecordAction::Approve) => Role::Approver,
            Self::Record(RecordAction::Close)
            | Self::Account(AccountAction::Close | AccountAction::Reopen)
            | Self::Period(
                PeriodAction::Create
                | PeriodAction::Close
                | PeriodAction::Reopen
                | PeriodAction::Delete,
            ) => Role::Controller,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decides whether an actor may perform an action on an entity.
///
/// For creations the target is the parent the entity is created under
/// (or the new period's id for period creation).
pub trait Authorizer: Send + Sync {
    /// Returns true if the action is permitted.
    fn permits(&self, actor: ActorId, action: Action, target: EntityRef) -> bool;
}

/// Permits everything. Used when authorization happens upstream.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn permits(&self, _actor: ActorId, _action: Action, _target: EntityRef) -> bool {
        true
    }
}

/// Ledger role, ordered from lowest to highest privilege.
///
/// Higher roles can perform all actions of lower roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Read-only access.
    Viewer = 0,
    /// Can create, edit and delete records and accounts.
    Bookkeeper = 1,
    /// Can approve and decline records.
    Approver = 2,
    /// Can close records, accounts and periods.
    Controller = 3,
}

impl Role {
    /// Parses a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "viewer" => Some(Self::Viewer),
            "bookkeeper" => Some(Self::Bookkeeper),
            "approver" => Some(Self::Approver),
            "controller" => Some(Self::Controller),
            _ => None,
        }
    }
}

/// Role-based policy: an actor may perform an action when their role is at
/// least the action's [`Action::minimum_role`]. Unknown actors are denied.
#[derive(Debug, Clone, Default)]
pub struct RolePolicy {
    roles: HashMap<ActorId, Role>,
}

impl RolePolicy {
    /// Creates an empty policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a role to an actor.
    #[must_use]
    pub fn grant(mut self, actor: ActorId, role: Role) -> Self {
        self.roles.insert(actor, role);
        self
    }

    /// Returns the actor's role, if any.
    #[must_use]
    pub fn role_of(&self, actor: ActorId) -> Option<Role> {
        self.roles.get(&actor).copied()
    }
}

impl Authorizer for RolePolicy {
    fn permits(&self, actor: ActorId, action: Action, _target: EntityRef) -> bool {
        self.role_of(actor)
            .is_some_and(|role| role >= action.minimum_role())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kassa_shared::types::RecordId;
    use rstest::rstest;

    fn target() -> EntityRef {
        EntityRef::Record(RecordId::new())
    }

    #[rstest]
    #[case(Role::Viewer, Action::Record(RecordAction::Create), false)]
    #[case(Role::Bookkeeper, Action::Record(RecordAction::Create), true)]
    #[case(Role::Bookkeeper, Action::Record(RecordAction::Approve), false)]
    #[case(Role::Approver, Action::Record(RecordAction::Decline), true)]
    #[case(Role::Approver, Action::Record(RecordAction::Close), false)]
    #[case(Role::Approver, Action::Period(PeriodAction::Close), false)]
    #[case(Role::Controller, Action::Period(PeriodAction::Close), true)]
    #[case(Role::Controller, Action::Account(AccountAction::Delete), true)]
    fn test_role_policy(#[case] role: Role, #[case] action: Action, #[case] expected: bool) {
        let actor = ActorId::new();
        let policy = RolePolicy::new().grant(actor, role);
        assert_eq!(policy.permits(actor, action, target()), expected);
    }

    #[test]
    fn test_unknown_actor_is_denied() {
        let policy = RolePolicy::new().grant(ActorId::new(), Role::Controller);
        assert!(!policy.permits(
            ActorId::new(),
            Action::Record(RecordAction::Edit),
            target()
        ));
    }

    #[test]
    fn test_allow_all() {
        assert!(AllowAll.permits(
            ActorId::new(),
            Action::Period(PeriodAction::Delete),
            target()
        ));
    }

    #[test]
    fn test_role_parse_and_action_display() {
        assert_eq!(Role::parse("Approver"), Some(Role::Approver));
        assert_eq!(Role::parse("owner"), None);
        assert_eq!(
            Action::Account(AccountAction::Reopen).to_string(),
            "account.reopen"
        );
    }
}
