//! Ledger records: single debit or credit movements.

use std::fmt;

use chrono::{DateTime, Utc};
use kassa_shared::types::{AccountId, PeriodId, RecordId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Record status in the approval workflow.
///
/// The valid transitions are:
/// - Published → Declined (decline)
/// - Approved → Declined (decline)
/// - Published → Approved (approve)
/// - Declined → Approved (approve)
/// - Approved → Closed (close, terminal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Initial status of every new record.
    Published,
    /// Declined by an approver.
    Declined,
    /// Approved by an approver.
    Approved,
    /// Closed; the record can no longer change.
    Closed,
}

impl RecordStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Declined => "declined",
            Self::Approved => "approved",
            Self::Closed => "closed",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "published" => Some(Self::Published),
            "declined" => Some(Self::Declined),
            "approved" => Some(Self::Approved),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    /// Returns true if the record counts towards `record_count_unapproved`.
    #[must_use]
    pub fn is_unapproved(&self) -> bool {
        !matches!(self, Self::Approved | Self::Closed)
    }

    /// Returns true if the record counts towards `record_count_declined`.
    #[must_use]
    pub fn is_declined(&self) -> bool {
        matches!(self, Self::Declined)
    }

    /// Returns true if the record may still be edited.
    #[must_use]
    pub fn is_editable(&self) -> bool {
        !matches!(self, Self::Closed)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction of a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Debit side; contributes negatively to the balance.
    Debit,
    /// Credit side; contributes positively to the balance.
    Credit,
}

/// A validated, non-negative amount on exactly one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Movement {
    value: Decimal,
    value_type: ValueType,
}

impl Movement {
    /// Builds a movement from a debit/credit pair.
    ///
    /// Exactly one side must be given and it must not be negative.
    pub fn from_sides(
        debit: Option<Decimal>,
        credit: Option<Decimal>,
    ) -> Result<Self, LedgerError> {
        let (value, value_type) = match (debit, credit) {
            (Some(value), None) => (value, ValueType::Debit),
            (None, Some(value)) => (value, ValueType::Credit),
            (None, None) => return Err(LedgerError::MissingMovement),
            (Some(_), Some(_)) => return Err(LedgerError::AmbiguousMovement),
        };

        if value < Decimal::ZERO {
            return Err(LedgerError::NegativeValue(value));
        }

        Ok(Self { value, value_type })
    }

    /// The unsigned amount.
    #[must_use]
    pub fn value(&self) -> Decimal {
        self.value
    }

    /// The side of the movement.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Debit counts negative, credit counts positive.
    #[must_use]
    pub fn signed(&self) -> Decimal {
        match self.value_type {
            ValueType::Debit => -self.value,
            ValueType::Credit => self.value,
        }
    }
}

/// A single movement, child of exactly one account.
///
/// `value` and `value_type` are written once at creation; the store offers no
/// way to change them afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier.
    pub id: RecordId,
    /// Owning account.
    pub account_id: AccountId,
    /// Owning period, denormalized from the account.
    pub period_id: PeriodId,
    /// Counter-party account, if any.
    #[serde(default)]
    pub offset_account: Option<AccountId>,
    /// Unsigned amount.
    pub value: Decimal,
    /// Side of the movement.
    pub value_type: ValueType,
    /// Workflow status.
    pub status: RecordStatus,
    /// Free-text description.
    #[serde(default)]
    pub memo: String,
    /// Optimistic concurrency version, bumped on every write.
    #[serde(default = "initial_version")]
    pub version: u64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

fn initial_version() -> u64 {
    1
}

impl Record {
    /// The record's movement.
    #[must_use]
    pub fn movement(&self) -> Movement {
        Movement {
            value: self.value,
            value_type: self.value_type,
        }
    }
}

/// Input for creating a record.
#[derive(Debug, Clone)]
pub struct NewRecord {
    /// Owning account.
    pub account_id: AccountId,
    /// Owning period; resolved from the account when absent.
    pub period_id: Option<PeriodId>,
    /// Debit amount.
    pub debit: Option<Decimal>,
    /// Credit amount.
    pub credit: Option<Decimal>,
    /// Counter-party account.
    pub offset_account: Option<AccountId>,
    /// Free-text description.
    pub memo: String,
}

impl NewRecord {
    /// A debit movement on the account.
    #[must_use]
    pub fn debit(account_id: AccountId, value: Decimal) -> Self {
        Self::sides(account_id, Some(value), None)
    }

    /// A credit movement on the account.
    #[must_use]
    pub fn credit(account_id: AccountId, value: Decimal) -> Self {
        Self::sides(account_id, None, Some(value))
    }

    /// Raw debit/credit pair, validated on creation.
    #[must_use]
    pub fn sides(account_id: AccountId, debit: Option<Decimal>, credit: Option<Decimal>) -> Self {
        Self {
            account_id,
            period_id: None,
            debit,
            credit,
            offset_account: None,
            memo: String::new(),
        }
    }

    /// Pins the period explicitly.
    #[must_use]
    pub fn in_period(mut self, period_id: PeriodId) -> Self {
        self.period_id = Some(period_id);
        self
    }

    /// Sets the counter-party account.
    #[must_use]
    pub fn with_offset(mut self, account_id: AccountId) -> Self {
        self.offset_account = Some(account_id);
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }
}

/// Requested changes to a record.
///
/// `value` and `value_type` are accepted for compatibility with callers that
/// send whole rows, but they never change a stored record.
#[derive(Debug, Clone, Default)]
pub struct RecordEdit {
    /// New description.
    pub memo: Option<String>,
    /// New counter-party account (`Some(None)` clears it).
    pub offset_account: Option<Option<AccountId>>,
    /// Ignored.
    pub value: Option<Decimal>,
    /// Ignored.
    pub value_type: Option<ValueType>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(Some(dec!(100)), None, ValueType::Debit, dec!(-100))]
    #[case(None, Some(dec!(50)), ValueType::Credit, dec!(50))]
    #[case(Some(dec!(0)), None, ValueType::Debit, dec!(0))]
    fn test_movement_from_one_side(
        #[case] debit: Option<Decimal>,
        #[case] credit: Option<Decimal>,
        #[case] expected_type: ValueType,
        #[case] expected_signed: Decimal,
    ) {
        let movement = Movement::from_sides(debit, credit).unwrap();
        assert_eq!(movement.value_type(), expected_type);
        assert_eq!(movement.signed(), expected_signed);
    }

    #[test]
    fn test_movement_requires_a_side() {
        assert!(matches!(
            Movement::from_sides(None, None),
            Err(LedgerError::MissingMovement)
        ));
    }

    #[test]
    fn test_movement_rejects_both_sides() {
        assert!(matches!(
            Movement::from_sides(Some(dec!(1)), Some(dec!(1))),
            Err(LedgerError::AmbiguousMovement)
        ));
    }

    #[test]
    fn test_movement_rejects_negative() {
        assert!(matches!(
            Movement::from_sides(None, Some(dec!(-5))),
            Err(LedgerError::NegativeValue(_))
        ));
    }

    #[rstest]
    #[case(RecordStatus::Published, true, false, true)]
    #[case(RecordStatus::Declined, true, true, true)]
    #[case(RecordStatus::Approved, false, false, true)]
    #[case(RecordStatus::Closed, false, false, false)]
    fn test_status_predicates(
        #[case] status: RecordStatus,
        #[case] unapproved: bool,
        #[case] declined: bool,
        #[case] editable: bool,
    ) {
        assert_eq!(status.is_unapproved(), unapproved);
        assert_eq!(status.is_declined(), declined);
        assert_eq!(status.is_editable(), editable);
    }

    #[test]
    fn test_status_parse_roundtrips_as_str() {
        for status in [
            RecordStatus::Published,
            RecordStatus::Declined,
            RecordStatus::Approved,
            RecordStatus::Closed,
        ] {
            assert_eq!(RecordStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RecordStatus::parse("APPROVED"), Some(RecordStatus::Approved));
        assert_eq!(RecordStatus::parse("pending"), None);
    }
}
