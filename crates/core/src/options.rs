use std::fmt;
use std::sync::Arc;

use crate::cas::{CasCondition, CasResultListener};
use crate::consistency::ConsistencyLevel;

/// Per-call write options.
#[derive(Clone, Default)]
pub struct WriteOptions {
    /// Seconds.
    pub ttl: Option<u32>,
    /// Microseconds since Unix epoch.
    pub timestamp: Option<i64>,
    pub consistency: Option<ConsistencyLevel>,
    pub serial_consistency: Option<ConsistencyLevel>,
    pub if_not_exists: bool,
    /// Rendered and bound in declaration order.
    pub cas_conditions: Vec<CasCondition>,
    pub cas_listener: Option<Arc<dyn CasResultListener>>,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, seconds: u32) -> Self {
        self.ttl = Some(seconds);
        self
    }

    pub fn with_timestamp(mut self, micros: i64) -> Self {
        self.timestamp = Some(micros);
        self
    }

    pub fn with_consistency(mut self, level: ConsistencyLevel) -> Self {
        self.consistency = Some(level);
        self
    }

    pub fn with_serial_consistency(mut self, level: ConsistencyLevel) -> Self {
        self.serial_consistency = Some(level);
        self
    }

    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    pub fn with_condition(mut self, condition: CasCondition) -> Self {
        self.cas_conditions.push(condition);
        self
    }

    pub fn with_cas_listener(mut self, listener: Arc<dyn CasResultListener>) -> Self {
        self.cas_listener = Some(listener);
        self
    }

    /// Whether the write carries a lightweight-transaction precondition.
    pub fn is_conditional(&self) -> bool {
        self.if_not_exists || !self.cas_conditions.is_empty()
    }
}

impl fmt::Debug for WriteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteOptions")
            .field("ttl", &self.ttl)
            .field("timestamp", &self.timestamp)
            .field("consistency", &self.consistency)
            .field("serial_consistency", &self.serial_consistency)
            .field("if_not_exists", &self.if_not_exists)
            .field("cas_conditions", &self.cas_conditions)
            .field("cas_listener", &self.cas_listener.is_some())
            .finish()
    }
}
