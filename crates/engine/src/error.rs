use quill_core::{CasResult, CoreError};
use quill_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("usage error: {0}")]
    Usage(String),

    #[error("{0}")]
    CasRejected(CasResult),

    #[error("entity lock poisoned")]
    LockPoisoned,

    #[error("worker pool dropped the write before it completed")]
    TaskDropped,
}

impl EngineError {
    pub(crate) fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }
}

impl From<CasResult> for EngineError {
    fn from(result: CasResult) -> Self {
        Self::CasRejected(result)
    }
}
