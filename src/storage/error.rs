//! Storage layer error types
//!
//! Every failure an engine operation can report is defined here. All of them
//! are local validation failures: an operation that returns one of these has
//! made no change.

use thiserror::Error;

use crate::storage::types::{BranchId, CommitId, InvalidNameError};

/// the main error type for storage and engine operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// commit attempted while the branch has nothing staged
    #[error("nothing staged to commit on branch {branch}")]
    NothingStaged { branch: BranchId },

    /// the commit id does not resolve
    #[error("commit not found: {0}")]
    CommitNotFound(CommitId),

    /// the branch id does not resolve
    #[error("branch not found: {0}")]
    BranchNotFound(BranchId),

    /// the active branch can never be removed
    #[error("cannot delete the currently active branch {0}")]
    ActiveBranchDeletion(BranchId),

    /// reset/revert target is outside the active branch's history
    #[error("commit {commit} does not belong to branch {branch}")]
    ForeignCommit { commit: CommitId, branch: BranchId },

    /// invalid branch name or id
    #[error("invalid name: {0}")]
    InvalidName(#[from] InvalidNameError),

    /// internal invariant violation that shouldn't happen
    #[error("internal error: {0}")]
    Internal(String),
}

impl StorageError {
    /// check if this error indicates the resource doesn't exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::CommitNotFound(_) | StorageError::BranchNotFound(_)
        )
    }

    /// check if the caller can fix this error by changing the request
    pub fn is_client_error(&self) -> bool {
        !matches!(self, StorageError::Internal(_))
    }

    /// stable short name, used in error payloads
    pub fn kind(&self) -> &'static str {
        match self {
            StorageError::NothingStaged { .. } => "nothingStaged",
            StorageError::CommitNotFound(_) => "commitNotFound",
            StorageError::BranchNotFound(_) => "branchNotFound",
            StorageError::ActiveBranchDeletion(_) => "activeBranchDeletion",
            StorageError::ForeignCommit { .. } => "foreignCommit",
            StorageError::InvalidName(_) => "invalidName",
            StorageError::Internal(_) => "internal",
        }
    }
}

/// result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
