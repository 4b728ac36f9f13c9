use std::sync::Arc;

use tracing::{debug, warn};

use quill_core::{CasOutcome, ConsistencyLevel, CqlValue, EntityHandle, FieldValue, WriteOptions};
use quill_storage::BatchType;

use crate::error::EngineError;
use crate::executor::{submit, WriteFuture};
use crate::flush::{FlushContext, FlushMode};
use crate::manager::{EntityManager, WriteKind};
use crate::statement::{GeneratedStatement, PendingStatement};

const NATIVE_PREFIXES: [&str; 3] = ["INSERT", "UPDATE", "DELETE"];

/// Configures a batch session before it starts.
#[derive(Debug)]
pub struct BatchBuilder {
    manager: EntityManager,
    mode: FlushMode,
    batch_type: BatchType,
    consistency: Option<ConsistencyLevel>,
    serial_consistency: Option<ConsistencyLevel>,
}

impl BatchBuilder {
    pub(crate) fn new(manager: EntityManager) -> Self {
        Self {
            manager,
            mode: FlushMode::Batch,
            batch_type: BatchType::Logged,
            consistency: None,
            serial_consistency: None,
        }
    }

    /// Stamp every operation with a strictly increasing timestamp.
    pub fn ordered(mut self) -> Self {
        self.mode = FlushMode::OrderedBatch;
        self
    }

    pub fn unlogged(mut self) -> Self {
        self.batch_type = BatchType::Unlogged;
        self
    }

    pub fn consistency(mut self, level: ConsistencyLevel) -> Self {
        self.consistency = Some(level);
        self
    }

    pub fn serial_consistency(mut self, level: ConsistencyLevel) -> Self {
        self.serial_consistency = Some(level);
        self
    }

    pub fn start(self) -> Batch {
        let mut context = FlushContext::new(Arc::clone(self.manager.store()), self.mode)
            .with_batch_type(self.batch_type);
        context.start_batch(self.consistency, self.serial_consistency);
        debug!(
            mode = ?self.mode,
            batch_type = self.batch_type.as_str(),
            "batch started"
        );
        Batch {
            manager: self.manager,
            context,
        }
    }
}

/// Accumulates entity writes and sends them as one envelope on flush, with
/// counter writes in a separate COUNTER envelope.
///
/// Consistency and serial consistency are fixed per batch: an operation
/// asking for a different level, or attaching a CAS listener, clears the
/// batch and fails.
#[derive(Debug)]
pub struct Batch {
    manager: EntityManager,
    context: FlushContext,
}

impl Batch {
    pub fn insert(&mut self, entity: EntityHandle, options: WriteOptions) -> Result<(), EngineError> {
        self.check(&options)?;
        self.manager
            .prepare(&mut self.context, WriteKind::Insert, &entity, &options)
    }

    pub fn update(&mut self, entity: EntityHandle, options: WriteOptions) -> Result<(), EngineError> {
        self.check(&options)?;
        self.manager
            .prepare(&mut self.context, WriteKind::Update, &entity, &options)
    }

    pub fn remove(&mut self, entity: EntityHandle, options: WriteOptions) -> Result<(), EngineError> {
        self.check(&options)?;
        self.manager
            .prepare(&mut self.context, WriteKind::Remove, &entity, &options)
    }

    pub fn remove_by_id(
        &mut self,
        entity_name: &str,
        key: &[FieldValue],
        options: WriteOptions,
    ) -> Result<(), EngineError> {
        self.check(&options)?;
        self.manager
            .prepare_remove_by_id(&mut self.context, entity_name, key, &options)
    }

    /// Add a hand-written INSERT, UPDATE or DELETE. Its text is sent as is.
    pub fn batch_native_statement(&mut self, query: &str, values: Vec<CqlValue>) -> Result<(), EngineError> {
        let head = query.trim_start();
        let accepted = NATIVE_PREFIXES.iter().any(|prefix| {
            head.get(..prefix.len())
                .is_some_and(|word| word.eq_ignore_ascii_case(prefix))
        });
        if !accepted {
            return Err(EngineError::usage(format!(
                "only INSERT, UPDATE or DELETE can join a batch: {query}"
            )));
        }
        let consistency = self
            .context
            .consistency()
            .unwrap_or(self.manager.config().default_write_consistency);
        let pending = PendingStatement {
            statement: GeneratedStatement::new(query.to_string(), values),
            consistency,
            serial_consistency: self.context.serial_consistency(),
            listener: None,
        };
        debug!(query, "native statement queued");
        self.context.push_statement(pending);
        Ok(())
    }

    /// Restart the session with new levels, dropping anything pending.
    pub fn start_batch(
        &mut self,
        consistency: Option<ConsistencyLevel>,
        serial_consistency: Option<ConsistencyLevel>,
    ) {
        self.context.start_batch(consistency, serial_consistency);
    }

    pub fn clean_batch(&mut self) {
        self.context.clean_batch();
    }

    pub fn flush(&mut self) -> Result<CasOutcome, EngineError> {
        self.context.flush()
    }

    /// Hand the pending work to the executor. The batch itself is left
    /// empty and can keep accumulating while the flush runs.
    pub fn flush_async(&mut self) -> WriteFuture {
        let mut in_flight = self.context.duplicate();
        self.context.clean_batch();
        submit(self.manager.executor(), move || in_flight.flush())
    }

    pub fn end_batch(mut self) -> Result<CasOutcome, EngineError> {
        self.context.end_batch()
    }

    pub fn pending(&self) -> usize {
        self.context.pending()
    }

    pub fn context(&self) -> &FlushContext {
        &self.context
    }

    fn check(&mut self, options: &WriteOptions) -> Result<(), EngineError> {
        if let Some(level) = options.consistency {
            if self.context.consistency() != Some(level) {
                self.context.clean_batch();
                return Err(EngineError::usage(format!(
                    "a batch runs at one consistency level; {level} was requested per operation, \
                     set it when starting the batch instead"
                )));
            }
        }
        if let Some(level) = options.serial_consistency {
            if self.context.serial_consistency() != Some(level) {
                self.context.clean_batch();
                return Err(EngineError::usage(format!(
                    "a batch runs at one serial consistency level; {level} was requested per \
                     operation, set it when starting the batch instead"
                )));
            }
        }
        if options.cas_listener.is_some() {
            self.context.clean_batch();
            return Err(EngineError::usage(
                "CAS result listeners are not supported in a batch",
            ));
        }
        Ok(())
    }
}

impl Drop for Batch {
    fn drop(&mut self) {
        let pending = self.context.pending();
        if pending > 0 {
            warn!(pending, "batch dropped with unflushed statements");
        }
    }
}
