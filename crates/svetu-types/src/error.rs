use thiserror::Error;

use crate::draft::{DraftId, UserId};

/// Errors from key-value backend operations (used by trait definitions in svetu-core).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),
}

/// Errors related to draft operations.
///
/// Missing, expired, and corrupt drafts are not errors; the store reports
/// them as absent. Only refused writes and failed writes surface here.
#[derive(Debug, Error)]
pub enum DraftError {
    #[error("draft '{draft_id}' belongs to user '{owner}', not '{actor}'")]
    OwnershipViolation {
        draft_id: DraftId,
        owner: UserId,
        actor: UserId,
    },

    #[error("draft '{draft_id}' was saved elsewhere: expected version {expected}, stored version {actual}")]
    VersionConflict {
        draft_id: DraftId,
        expected: u64,
        actual: u64,
    },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<StorageError> for DraftError {
    fn from(e: StorageError) -> Self {
        DraftError::Storage(e.to_string())
    }
}
