use serde::{Deserialize, Serialize};

use quill_core::{ConsistencyLevel, CqlValue};

use crate::error::StorageError;
use crate::result::ResultSet;

/// A fully bound statement ready for submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub query: String,
    pub values: Vec<CqlValue>,
    /// `None` leaves the choice to the store client.
    pub consistency: Option<ConsistencyLevel>,
    pub serial_consistency: Option<ConsistencyLevel>,
    /// Ask the store to record a query trace.
    pub tracing: bool,
}

impl Statement {
    pub fn new(query: impl Into<String>, values: Vec<CqlValue>) -> Self {
        Self {
            query: query.into(),
            values,
            consistency: None,
            serial_consistency: None,
            tracing: false,
        }
    }

    pub fn with_consistency(mut self, level: ConsistencyLevel) -> Self {
        self.consistency = Some(level);
        self
    }

    pub fn with_serial_consistency(mut self, level: Option<ConsistencyLevel>) -> Self {
        self.serial_consistency = level;
        self
    }

    pub fn with_tracing(mut self, tracing: bool) -> Self {
        self.tracing = tracing;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchType {
    Logged,
    Unlogged,
    Counter,
}

impl BatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Logged => "LOGGED",
            Self::Unlogged => "UNLOGGED",
            Self::Counter => "COUNTER",
        }
    }

    pub fn parse(s: &str) -> Result<Self, StorageError> {
        match s {
            "LOGGED" => Ok(Self::Logged),
            "UNLOGGED" => Ok(Self::Unlogged),
            "COUNTER" => Ok(Self::Counter),
            _ => Err(StorageError::Serialization(format!("unknown batch type: {s}"))),
        }
    }
}

/// Statements submitted together under one batch type and consistency.
/// Per-statement consistency inside an envelope is ignored by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEnvelope {
    pub batch_type: BatchType,
    pub statements: Vec<Statement>,
    pub consistency: ConsistencyLevel,
    pub serial_consistency: Option<ConsistencyLevel>,
    pub tracing: bool,
}

impl BatchEnvelope {
    pub fn new(batch_type: BatchType, consistency: ConsistencyLevel) -> Self {
        Self {
            batch_type,
            statements: Vec::new(),
            consistency,
            serial_consistency: None,
            tracing: false,
        }
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// The store-execution boundary. Implementations own connection handling,
/// timeouts and retries; callers see results or errors unmodified.
pub trait Store: Send + Sync {
    fn execute(&self, statement: &Statement) -> Result<ResultSet, StorageError>;

    fn execute_batch(&self, batch: &BatchEnvelope) -> Result<ResultSet, StorageError>;
}

impl<S: Store + ?Sized> Store for std::sync::Arc<S> {
    fn execute(&self, statement: &Statement) -> Result<ResultSet, StorageError> {
        (**self).execute(statement)
    }

    fn execute_batch(&self, batch: &BatchEnvelope) -> Result<ResultSet, StorageError> {
        (**self).execute_batch(batch)
    }
}
