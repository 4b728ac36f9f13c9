use std::collections::VecDeque;
use std::sync::Mutex;

use tracing::trace;

use crate::error::StorageError;
use crate::result::ResultSet;
use crate::store::{BatchEnvelope, Statement, Store};

#[derive(Debug, Clone, PartialEq)]
pub enum Executed {
    Single(Statement),
    Batch(BatchEnvelope),
}

#[derive(Debug, Default)]
struct MemoryState {
    executed: Vec<Executed>,
    responses: VecDeque<Result<ResultSet, StorageError>>,
}

/// Scripted store: records every submission and answers from a queue of
/// canned responses, falling back to an empty result set.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, response: ResultSet) -> Result<(), StorageError> {
        self.state()?.responses.push_back(Ok(response));
        Ok(())
    }

    /// Make the next submission fail with `error`.
    pub fn fail_next(&self, error: StorageError) -> Result<(), StorageError> {
        self.state()?.responses.push_back(Err(error));
        Ok(())
    }

    pub fn executed(&self) -> Result<Vec<Executed>, StorageError> {
        Ok(self.state()?.executed.clone())
    }

    /// Every statement submitted, single or batched, in submission order.
    pub fn statements(&self) -> Result<Vec<Statement>, StorageError> {
        let state = self.state()?;
        let mut out = Vec::new();
        for executed in &state.executed {
            match executed {
                Executed::Single(statement) => out.push(statement.clone()),
                Executed::Batch(batch) => out.extend(batch.statements.iter().cloned()),
            }
        }
        Ok(out)
    }

    pub fn batches(&self) -> Result<Vec<BatchEnvelope>, StorageError> {
        Ok(self
            .state()?
            .executed
            .iter()
            .filter_map(|e| match e {
                Executed::Batch(batch) => Some(batch.clone()),
                Executed::Single(_) => None,
            })
            .collect())
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        let mut state = self.state()?;
        state.executed.clear();
        state.responses.clear();
        Ok(())
    }

    fn state(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, StorageError> {
        self.state.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn respond(&self, executed: Executed) -> Result<ResultSet, StorageError> {
        let mut state = self.state()?;
        state.executed.push(executed);
        state.responses.pop_front().unwrap_or_else(|| Ok(ResultSet::empty()))
    }
}

impl Store for MemoryStore {
    fn execute(&self, statement: &Statement) -> Result<ResultSet, StorageError> {
        trace!(query = %statement.query, "memory store execute");
        self.respond(Executed::Single(statement.clone()))
    }

    fn execute_batch(&self, batch: &BatchEnvelope) -> Result<ResultSet, StorageError> {
        trace!(batch_type = batch.batch_type.as_str(), size = batch.len(), "memory store batch");
        self.respond(Executed::Batch(batch.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::Row;
    use quill_core::{ConsistencyLevel, CqlValue};

    #[test]
    fn records_and_replays_in_order() {
        let store = MemoryStore::new();
        store.push_response(ResultSet::single(Row::applied(false))).unwrap();
        store
            .fail_next(StorageError::WriteFailure("replica down".into()))
            .unwrap();

        let first = store
            .execute(&Statement::new("UPDATE t SET a = ? WHERE id = ?", vec![CqlValue::Int(1), CqlValue::Int(2)]))
            .unwrap();
        assert_eq!(first.first_row().and_then(|r| r.get_bool("[applied]")), Some(false));

        let mut batch = BatchEnvelope::new(crate::BatchType::Logged, ConsistencyLevel::Quorum);
        batch.statements.push(Statement::new("DELETE FROM t WHERE id = ?", vec![CqlValue::Int(2)]));
        assert!(matches!(store.execute_batch(&batch), Err(StorageError::WriteFailure(_))));

        assert!(store.execute(&Statement::new("SELECT", vec![])).unwrap().rows.is_empty());
        assert_eq!(store.executed().unwrap().len(), 3);
        assert_eq!(store.statements().unwrap().len(), 3);
        assert_eq!(store.batches().unwrap(), vec![batch]);
    }
}
