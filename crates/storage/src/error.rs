use quill_core::ConsistencyLevel;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("write timed out at {consistency}: {received} of {required} replicas acknowledged")]
    Timeout {
        consistency: ConsistencyLevel,
        received: u32,
        required: u32,
    },

    #[error("not enough replicas for {consistency}: {alive} alive, {required} required")]
    Unavailable {
        consistency: ConsistencyLevel,
        alive: u32,
        required: u32,
    },

    #[error("write failure: {0}")]
    WriteFailure(String),

    #[error("store lock poisoned")]
    LockPoisoned,

    #[error("core error: {0}")]
    Core(#[from] quill_core::CoreError),
}
