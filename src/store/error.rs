use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The backend refused the write for lack of space, or the snapshot
    /// could not be serialized. The draft was NOT saved.
    #[error("storage quota exceeded: {0}")]
    QuotaExceeded(String),
    /// The backend could not be reached (network, auth, server failure).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// A persisted payload could not be parsed.
    #[error("snapshot corrupt: {0}")]
    Corrupt(String),
}

/// The user-facing reason a save failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveFailure {
    QuotaExceeded,
    Unavailable,
}

impl StorageError {
    pub fn kind(&self) -> SaveFailure {
        match self {
            StorageError::QuotaExceeded(_) => SaveFailure::QuotaExceeded,
            // A corrupt payload on a write path means the backend mangled it.
            StorageError::Unavailable(_) | StorageError::Corrupt(_) => SaveFailure::Unavailable,
        }
    }
}
