use std::time::{SystemTime, UNIX_EPOCH};

use crate::CoreError;

/// Current wall-clock time in microseconds since Unix epoch.
pub fn physical_now_micros() -> Result<i64, CoreError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .map_err(|_| CoreError::InvalidOperation("system clock before epoch".into()))
}

/// Source of strictly increasing write timestamps, used to stamp the
/// statements of an ordered batch.
#[derive(Debug, Default, Clone)]
pub struct MicrosClock {
    last: i64,
}

impl MicrosClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next timestamp: wall-clock micros, or one past the previous value
    /// when the wall clock has not advanced.
    pub fn tick(&mut self) -> Result<i64, CoreError> {
        let now = physical_now_micros()?;
        let next = if now > self.last { now } else { self.last + 1 };
        self.last = next;
        Ok(next)
    }
}
