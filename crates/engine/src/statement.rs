use std::fmt;
use std::sync::Arc;

use quill_core::{CasResultListener, ConsistencyLevel, CqlValue};

/// Query text plus positional bound values, as produced by the generator.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedStatement {
    pub query: String,
    pub values: Vec<CqlValue>,
    /// Targets counter columns and must travel in a counter batch.
    pub counter: bool,
    /// Write consistency declared on the property a counter statement updates.
    pub property_consistency: Option<ConsistencyLevel>,
}

impl GeneratedStatement {
    pub fn new(query: String, values: Vec<CqlValue>) -> Self {
        Self {
            query,
            values,
            counter: false,
            property_consistency: None,
        }
    }

    pub fn counter(query: String, values: Vec<CqlValue>, consistency: Option<ConsistencyLevel>) -> Self {
        Self {
            query,
            values,
            counter: true,
            property_consistency: consistency,
        }
    }

    pub fn placeholder_count(&self) -> usize {
        self.query.matches('?').count()
    }
}

/// A generated statement queued in a flush context with its resolved
/// execution settings.
#[derive(Clone)]
pub struct PendingStatement {
    pub statement: GeneratedStatement,
    pub consistency: ConsistencyLevel,
    pub serial_consistency: Option<ConsistencyLevel>,
    pub listener: Option<Arc<dyn CasResultListener>>,
}

impl fmt::Debug for PendingStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingStatement")
            .field("statement", &self.statement)
            .field("consistency", &self.consistency)
            .field("serial_consistency", &self.serial_consistency)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}
