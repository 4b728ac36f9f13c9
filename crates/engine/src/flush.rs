//! Per-unit-of-work accumulator and executor of generated statements.
//!
//! A flush context is owned by exactly one manager call or batch session and
//! is never shared between threads; nested work gets a `duplicate`.

use std::sync::Arc;

use tracing::{debug, warn};

use quill_core::{CasOutcome, ChangeSource, ConsistencyLevel, EntityHandle, EntityMeta, Event, MicrosClock};
use quill_storage::{BatchEnvelope, BatchType, Statement, Store};

use crate::cas;
use crate::error::EngineError;
use crate::log;
use crate::statement::PendingStatement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushMode {
    /// Each statement runs on its own as soon as the operation is flushed.
    Immediate,
    Batch,
    /// Like `Batch`, with strictly increasing write timestamps per operation.
    OrderedBatch,
}

/// Post-write interceptor invocation deferred until its statements commit.
#[derive(Clone)]
pub struct EventHolder {
    entity: EntityHandle,
    meta: Arc<EntityMeta>,
    event: Event,
}

impl EventHolder {
    pub fn new(entity: EntityHandle, meta: Arc<EntityMeta>, event: Event) -> Self {
        Self { entity, meta, event }
    }

    /// Run the interceptors. Values a post-write interceptor sets describe
    /// the persisted state, so they become part of the clean snapshot.
    pub fn trigger(&self) -> Result<(), EngineError> {
        let mut entity = self.entity.lock().map_err(|_| EngineError::LockPoisoned)?;
        self.meta.intercept(&mut *entity, self.event);
        if self.event.is_post() {
            entity.mark_clean();
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct FlushContext {
    store: Arc<dyn Store>,
    mode: FlushMode,
    batch_type: BatchType,
    statements: Vec<PendingStatement>,
    counter_statements: Vec<PendingStatement>,
    event_holders: Vec<EventHolder>,
    consistency: Option<ConsistencyLevel>,
    serial_consistency: Option<ConsistencyLevel>,
    clock: MicrosClock,
}

impl FlushContext {
    pub fn new(store: Arc<dyn Store>, mode: FlushMode) -> Self {
        Self {
            store,
            mode,
            batch_type: BatchType::Logged,
            statements: Vec::new(),
            counter_statements: Vec::new(),
            event_holders: Vec::new(),
            consistency: None,
            serial_consistency: None,
            clock: MicrosClock::new(),
        }
    }

    pub fn immediate(store: Arc<dyn Store>) -> Self {
        Self::new(store, FlushMode::Immediate)
    }

    /// Envelope type for non-counter statements in batch modes.
    pub fn with_batch_type(mut self, batch_type: BatchType) -> Self {
        self.batch_type = batch_type;
        self
    }

    pub fn mode(&self) -> FlushMode {
        self.mode
    }

    pub fn batch_type(&self) -> BatchType {
        self.batch_type
    }

    pub fn consistency(&self) -> Option<ConsistencyLevel> {
        self.consistency
    }

    pub fn serial_consistency(&self) -> Option<ConsistencyLevel> {
        self.serial_consistency
    }

    pub fn is_batch(&self) -> bool {
        self.mode != FlushMode::Immediate
    }

    /// Pending statements, counter statements included.
    pub fn pending(&self) -> usize {
        self.statements.len() + self.counter_statements.len()
    }

    pub fn pending_events(&self) -> usize {
        self.event_holders.len()
    }

    pub fn push_statement(&mut self, pending: PendingStatement) {
        if pending.statement.counter {
            self.counter_statements.push(pending);
        } else {
            self.statements.push(pending);
        }
    }

    /// Pre-events run now on the calling thread; post-events wait for flush.
    pub fn trigger_interceptor(
        &mut self,
        entity: &EntityHandle,
        meta: &Arc<EntityMeta>,
        event: Event,
    ) -> Result<(), EngineError> {
        if !meta.has_interceptors_for(event) {
            return Ok(());
        }
        let holder = EventHolder::new(Arc::clone(entity), Arc::clone(meta), event);
        if event.is_post() {
            self.event_holders.push(holder);
            Ok(())
        } else {
            holder.trigger()
        }
    }

    /// Next ordering timestamp, in ordered-batch mode only.
    pub fn next_timestamp(&mut self) -> Result<Option<i64>, EngineError> {
        match self.mode {
            FlushMode::OrderedBatch => Ok(Some(self.clock.tick()?)),
            FlushMode::Immediate | FlushMode::Batch => Ok(None),
        }
    }

    /// Begin a batch session with a fixed consistency, dropping pending state.
    pub fn start_batch(
        &mut self,
        consistency: Option<ConsistencyLevel>,
        serial_consistency: Option<ConsistencyLevel>,
    ) {
        self.clean_batch();
        self.consistency = consistency;
        self.serial_consistency = serial_consistency;
    }

    pub fn clean_batch(&mut self) {
        self.statements.clear();
        self.counter_statements.clear();
        self.event_holders.clear();
    }

    pub fn end_batch(&mut self) -> Result<CasOutcome, EngineError> {
        self.flush()
    }

    /// Independent copy that keeps the pending statements.
    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    /// Independent copy with the same mode and consistency but nothing pending.
    pub fn duplicate_with_no_data(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            mode: self.mode,
            batch_type: self.batch_type,
            statements: Vec::new(),
            counter_statements: Vec::new(),
            event_holders: Vec::new(),
            consistency: self.consistency,
            serial_consistency: self.serial_consistency,
            clock: self.clock.clone(),
        }
    }

    /// Execute everything pending, then run deferred post-write callbacks.
    ///
    /// Pending state is consumed whatever the result. A CAS rejection or an
    /// execution error stops the flush: later statements and callbacks are
    /// dropped, and nothing already executed is rolled back.
    pub fn flush(&mut self) -> Result<CasOutcome, EngineError> {
        let statements = std::mem::take(&mut self.statements);
        let counter_statements = std::mem::take(&mut self.counter_statements);
        let event_holders = std::mem::take(&mut self.event_holders);

        let outcome = match self.mode {
            FlushMode::Immediate => self.execute_each(statements.into_iter().chain(counter_statements))?,
            FlushMode::Batch | FlushMode::OrderedBatch => {
                let outcome = self.execute_envelope(self.batch_type, statements)?;
                if outcome.is_applied() {
                    self.execute_envelope(BatchType::Counter, counter_statements)?
                } else {
                    outcome
                }
            }
        };

        if outcome.is_applied() {
            for holder in &event_holders {
                holder.trigger()?;
            }
        } else {
            debug!(skipped_callbacks = event_holders.len(), "flush stopped by CAS rejection");
        }
        Ok(outcome)
    }

    fn execute_each(
        &self,
        statements: impl Iterator<Item = PendingStatement>,
    ) -> Result<CasOutcome, EngineError> {
        let tracing = log::tracing_enabled();
        for pending in statements {
            let statement = Statement::new(pending.statement.query, pending.statement.values)
                .with_consistency(pending.consistency)
                .with_serial_consistency(pending.serial_consistency)
                .with_tracing(tracing);
            log::log_statement("statement", &statement);
            let result = self.store.execute(&statement)?;
            log::log_execution_info(&result.execution_info);

            let outcome = cas::interpret(&statement.query, &result)?;
            if cas::is_cas(&statement.query) {
                cas::notify(pending.listener.as_ref(), &outcome);
            }
            if !outcome.is_applied() {
                return Ok(outcome);
            }
        }
        Ok(CasOutcome::Applied)
    }

    fn execute_envelope(
        &self,
        batch_type: BatchType,
        statements: Vec<PendingStatement>,
    ) -> Result<CasOutcome, EngineError> {
        let Some(first) = statements.first() else {
            return Ok(CasOutcome::Applied);
        };
        let consistency = self.consistency.unwrap_or(first.consistency);
        let serial_consistency = self.serial_consistency.or(first.serial_consistency);
        let tracing = log::tracing_enabled();

        let mut envelope = BatchEnvelope::new(batch_type, consistency);
        envelope.serial_consistency = serial_consistency;
        envelope.tracing = tracing;
        envelope.statements = statements
            .into_iter()
            .map(|p| Statement::new(p.statement.query, p.statement.values))
            .collect();

        log::log_batch_start(batch_type, consistency, envelope.len());
        for statement in &envelope.statements {
            log::log_statement("batched", statement);
        }
        let result = self.store.execute_batch(&envelope)?;
        log::log_batch_end(batch_type, consistency);
        log::log_execution_info(&result.execution_info);

        // A conditional batch answers with one [applied] row for the whole batch.
        match envelope.statements.iter().find(|s| cas::is_cas(&s.query)) {
            Some(conditional) => {
                let outcome = cas::interpret(&conditional.query, &result)?;
                if !outcome.is_applied() {
                    warn!(batch_type = batch_type.as_str(), "conditional batch rejected");
                }
                Ok(outcome)
            }
            None => Ok(CasOutcome::Applied),
        }
    }
}

impl std::fmt::Debug for FlushContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlushContext")
            .field("mode", &self.mode)
            .field("batch_type", &self.batch_type)
            .field("statements", &self.statements.len())
            .field("counter_statements", &self.counter_statements.len())
            .field("event_holders", &self.event_holders.len())
            .field("consistency", &self.consistency)
            .field("serial_consistency", &self.serial_consistency)
            .finish()
    }
}
