//! Entity store error types.

use kassa_shared::types::RecordId;
use thiserror::Error;

use crate::model::EntityRef;

/// Errors reported by an [`EntityStore`](super::EntityStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend failed (I/O, connection, serialization).
    #[error("Storage backend failure: {0}")]
    Backend(String),

    /// The entity does not exist.
    #[error("{0} does not exist")]
    Missing(EntityRef),

    /// An entity with the same id already exists.
    #[error("{0} already exists")]
    Duplicate(EntityRef),

    /// Non-cascading delete of an entity that still has children.
    #[error("{0} still has children")]
    HasChildren(EntityRef),

    /// The record changed since it was read.
    #[error("Record {record_id} was modified concurrently (expected version {expected}, found {actual})")]
    VersionConflict {
        /// The record.
        record_id: RecordId,
        /// Version the caller read.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },
}

impl StoreError {
    /// Returns the error code for callers.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Backend(_) => "STORE_BACKEND",
            Self::Missing(_) => "STORE_MISSING",
            Self::Duplicate(_) => "STORE_DUPLICATE",
            Self::HasChildren(_) => "STORE_HAS_CHILDREN",
            Self::VersionConflict { .. } => "STORE_VERSION_CONFLICT",
        }
    }
}
