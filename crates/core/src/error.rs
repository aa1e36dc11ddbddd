//! Ledger error types.
//!
//! Only faults live here: missing entities, invariant violations on creation
//! and store failures. Expected refusals (e.g. closing a period with
//! unapproved records) are reported through [`crate::outcome::Refusal`].

use kassa_shared::types::{AccountId, PeriodId, RecordId};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::model::EntityRef;
use crate::store::StoreError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Not Found ==========
    /// Period not found.
    #[error("Period not found: {0}")]
    PeriodNotFound(PeriodId),

    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Record not found.
    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),

    // ========== Invariant Violations ==========
    /// Record has neither a debit nor a credit amount.
    #[error("Record must specify a debit or a credit amount")]
    MissingMovement,

    /// Record has both a debit and a credit amount.
    #[error("Record must specify either debit or credit, not both")]
    AmbiguousMovement,

    /// Record amount is negative.
    #[error("Record amount cannot be negative: {0}")]
    NegativeValue(Decimal),

    /// Explicit period disagrees with the account's period.
    #[error("Account {account_id} belongs to period {actual}, not {requested}")]
    HierarchyMismatch {
        /// The account the record is created under.
        account_id: AccountId,
        /// The period the caller asked for.
        requested: PeriodId,
        /// The period the account belongs to.
        actual: PeriodId,
    },

    /// Ledger code already used within the period.
    #[error("Ledger code {ledger_code} already exists in period {period_id}")]
    DuplicateLedgerCode {
        /// The period.
        period_id: PeriodId,
        /// The duplicated code.
        ledger_code: String,
    },

    // ========== Store ==========
    /// Entity store failure.
    #[error(transparent)]
    Store(StoreError),
}

impl LedgerError {
    /// Returns the error code for callers.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::PeriodNotFound(_) => "PERIOD_NOT_FOUND",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::RecordNotFound(_) => "RECORD_NOT_FOUND",
            Self::MissingMovement => "MISSING_MOVEMENT",
            Self::AmbiguousMovement => "AMBIGUOUS_MOVEMENT",
            Self::NegativeValue(_) => "NEGATIVE_VALUE",
            Self::HierarchyMismatch { .. } => "HIERARCHY_MISMATCH",
            Self::DuplicateLedgerCode { .. } => "DUPLICATE_LEDGER_CODE",
            Self::Store(e) => e.error_code(),
        }
    }

    /// Returns true for the not-found family.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::PeriodNotFound(_) | Self::AccountNotFound(_) | Self::RecordNotFound(_)
        )
    }

    /// Not-found error for an entity reference.
    #[must_use]
    pub fn not_found(entity: EntityRef) -> Self {
        match entity {
            EntityRef::Period(id) => Self::PeriodNotFound(id),
            EntityRef::Account(id) => Self::AccountNotFound(id),
            EntityRef::Record(id) => Self::RecordNotFound(id),
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Missing(entity) => Self::not_found(entity),
            other => Self::Store(other),
        }
    }
}
