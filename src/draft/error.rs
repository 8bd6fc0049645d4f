use thiserror::Error;

use crate::snapshot::Validity;
use crate::store::StorageError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("snapshot cannot be restored: {0}")]
    InvalidSnapshot(Validity),
    #[error("draft controller has been torn down")]
    TornDown,
    #[error("draft persistence is disabled for this wizard")]
    Disabled,
}
