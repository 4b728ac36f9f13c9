use std::sync::Arc;

use tracing::{debug, info};

use quill_core::{
    CasOutcome, Config, ConsistencyResolver, EntityHandle, EntityMeta, EntityRegistry, Event,
    FieldValue, WriteOptions,
};
use quill_storage::Store;

use crate::batch::BatchBuilder;
use crate::error::EngineError;
use crate::executor::{submit, Executor, ThreadPerTask, WriteFuture};
use crate::flush::FlushContext;
use crate::generator::{primary_key_from, primary_key_of, StatementGenerator};
use crate::statement::{GeneratedStatement, PendingStatement};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteKind {
    Insert,
    Update,
    Remove,
}

impl WriteKind {
    fn name(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Remove => "remove",
        }
    }

    fn pre_event(&self) -> Event {
        match self {
            Self::Insert => Event::PrePersist,
            Self::Update => Event::PreUpdate,
            Self::Remove => Event::PreRemove,
        }
    }

    fn post_event(&self) -> Event {
        match self {
            Self::Insert => Event::PostPersist,
            Self::Update => Event::PostUpdate,
            Self::Remove => Event::PostRemove,
        }
    }
}

/// Entry point for entity writes. Cheap to clone; every call works on its
/// own flush context.
#[derive(Clone)]
pub struct EntityManager {
    store: Arc<dyn Store>,
    registry: Arc<EntityRegistry>,
    config: Arc<Config>,
    resolver: Arc<ConsistencyResolver>,
    generator: StatementGenerator,
    executor: Arc<dyn Executor>,
}

impl EntityManager {
    pub fn new(store: Arc<dyn Store>, registry: EntityRegistry, config: Config) -> Self {
        let resolver = ConsistencyResolver::new(&config, &registry);
        let generator = StatementGenerator::new(config.insert_strategy);
        info!(
            entities = registry.iter().count(),
            default_write = %config.default_write_consistency,
            "entity manager ready"
        );
        Self {
            store,
            registry: Arc::new(registry),
            config: Arc::new(config),
            resolver: Arc::new(resolver),
            generator,
            executor: Arc::new(ThreadPerTask),
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resolver(&self) -> &ConsistencyResolver {
        &self.resolver
    }

    pub fn generator(&self) -> &StatementGenerator {
        &self.generator
    }

    pub(crate) fn executor(&self) -> &dyn Executor {
        self.executor.as_ref()
    }

    pub fn meta(&self, entity_name: &str) -> Result<&Arc<EntityMeta>, EngineError> {
        self.registry
            .get(entity_name)
            .ok_or_else(|| EngineError::usage(format!("unknown entity '{entity_name}'")))
    }

    pub fn insert(&self, entity: EntityHandle, options: WriteOptions) -> Result<CasOutcome, EngineError> {
        self.write_now(WriteKind::Insert, &entity, &options)
    }

    pub fn update(&self, entity: EntityHandle, options: WriteOptions) -> Result<CasOutcome, EngineError> {
        self.write_now(WriteKind::Update, &entity, &options)
    }

    pub fn remove(&self, entity: EntityHandle, options: WriteOptions) -> Result<CasOutcome, EngineError> {
        self.write_now(WriteKind::Remove, &entity, &options)
    }

    /// Remove by primary key, components in partition-then-clustering order.
    pub fn remove_by_id(
        &self,
        entity_name: &str,
        key: &[FieldValue],
        options: WriteOptions,
    ) -> Result<CasOutcome, EngineError> {
        let mut context = FlushContext::immediate(Arc::clone(&self.store));
        self.prepare_remove_by_id(&mut context, entity_name, key, &options)?;
        context.flush()
    }

    /// Statements are generated on the calling thread, so usage errors are
    /// reported here; execution runs on the executor.
    pub fn insert_async(&self, entity: EntityHandle, options: WriteOptions) -> Result<WriteFuture, EngineError> {
        self.write_async(WriteKind::Insert, &entity, &options)
    }

    pub fn update_async(&self, entity: EntityHandle, options: WriteOptions) -> Result<WriteFuture, EngineError> {
        self.write_async(WriteKind::Update, &entity, &options)
    }

    pub fn remove_async(&self, entity: EntityHandle, options: WriteOptions) -> Result<WriteFuture, EngineError> {
        self.write_async(WriteKind::Remove, &entity, &options)
    }

    pub fn batch(&self) -> BatchBuilder {
        BatchBuilder::new(self.clone())
    }

    fn write_now(
        &self,
        kind: WriteKind,
        entity: &EntityHandle,
        options: &WriteOptions,
    ) -> Result<CasOutcome, EngineError> {
        let mut context = FlushContext::immediate(Arc::clone(&self.store));
        self.prepare(&mut context, kind, entity, options)?;
        context.flush()
    }

    fn write_async(
        &self,
        kind: WriteKind,
        entity: &EntityHandle,
        options: &WriteOptions,
    ) -> Result<WriteFuture, EngineError> {
        let mut context = FlushContext::immediate(Arc::clone(&self.store));
        self.prepare(&mut context, kind, entity, options)?;
        Ok(submit(self.executor.as_ref(), move || context.flush()))
    }

    /// Validate, run pre-interceptors, generate and queue the statements of
    /// one entity operation, and queue its post-interceptors.
    pub(crate) fn prepare(
        &self,
        context: &mut FlushContext,
        kind: WriteKind,
        entity: &EntityHandle,
        options: &WriteOptions,
    ) -> Result<(), EngineError> {
        let meta = {
            let guard = entity.lock().map_err(|_| EngineError::LockPoisoned)?;
            Arc::clone(self.meta(guard.entity_name())?)
        };
        validate_options(&meta, kind, options)?;
        let options = stamp(context, &meta, options)?;

        context.trigger_interceptor(entity, &meta, kind.pre_event())?;
        let statements = {
            let mut guard = entity.lock().map_err(|_| EngineError::LockPoisoned)?;
            let statements = match kind {
                WriteKind::Insert => self.generator.generate_insert(&*guard, &meta, &options)?,
                WriteKind::Update => self.generator.generate_update(&*guard, &meta, &options)?,
                WriteKind::Remove => {
                    let key = primary_key_of(&meta, &*guard)?;
                    self.generator.generate_remove(&meta, &key, &options)?
                }
            };
            guard.mark_clean();
            statements
        };
        debug!(
            entity = meta.entity_name(),
            operation = kind.name(),
            statements = statements.len(),
            "generated statements"
        );
        self.enqueue(context, &meta, statements, &options);
        context.trigger_interceptor(entity, &meta, kind.post_event())
    }

    pub(crate) fn prepare_remove_by_id(
        &self,
        context: &mut FlushContext,
        entity_name: &str,
        key: &[FieldValue],
        options: &WriteOptions,
    ) -> Result<(), EngineError> {
        let meta = Arc::clone(self.meta(entity_name)?);
        validate_options(&meta, WriteKind::Remove, options)?;
        let options = stamp(context, &meta, options)?;
        let key = primary_key_from(&meta, key)?;
        let statements = self.generator.generate_remove(&meta, &key, &options)?;
        self.enqueue(context, &meta, statements, &options);
        Ok(())
    }

    fn enqueue(
        &self,
        context: &mut FlushContext,
        meta: &EntityMeta,
        statements: Vec<GeneratedStatement>,
        options: &WriteOptions,
    ) {
        let serial_consistency = options
            .serial_consistency
            .or(self.config.default_serial_consistency);
        for statement in statements {
            // Per-property levels only steer counters written outside a batch.
            let call_override = if statement.counter && !context.is_batch() {
                options.consistency.or(statement.property_consistency)
            } else {
                options.consistency
            };
            let consistency = self.resolver.write(meta.table_name(), call_override);
            context.push_statement(PendingStatement {
                statement,
                consistency,
                serial_consistency,
                listener: options.cas_listener.clone(),
            });
        }
    }
}

impl std::fmt::Debug for EntityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityManager")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Usage errors for option combinations the store cannot honour.
fn validate_options(meta: &EntityMeta, kind: WriteKind, options: &WriteOptions) -> Result<(), EngineError> {
    if options.cas_listener.is_some() && !options.is_conditional() {
        return Err(EngineError::usage(
            "a CAS result listener requires IF NOT EXISTS or a CAS condition",
        ));
    }
    if let Some(level) = options.serial_consistency {
        if !level.is_serial() {
            return Err(EngineError::usage(format!("{level} is not a serial consistency level")));
        }
    }
    match kind {
        WriteKind::Insert if !options.cas_conditions.is_empty() => {
            return Err(EngineError::usage("insert accepts IF NOT EXISTS only, not CAS conditions"));
        }
        WriteKind::Update if options.if_not_exists => {
            return Err(EngineError::usage("IF NOT EXISTS applies to insert only"));
        }
        WriteKind::Remove if options.is_conditional() || options.ttl.is_some() => {
            return Err(EngineError::usage("remove accepts neither CAS conditions nor a TTL"));
        }
        _ => {}
    }
    if meta.is_clustered_counter() {
        if options.ttl.is_some() || options.timestamp.is_some() {
            return Err(EngineError::usage(format!(
                "counter entity {} accepts neither TTL nor timestamp",
                meta.entity_name()
            )));
        }
        if options.is_conditional() {
            return Err(EngineError::usage(format!(
                "counter entity {} cannot be written conditionally",
                meta.entity_name()
            )));
        }
    }
    Ok(())
}

/// In ordered batches every operation gets the next ordering timestamp.
/// Counter entities never carry one.
fn stamp(context: &mut FlushContext, meta: &EntityMeta, options: &WriteOptions) -> Result<WriteOptions, EngineError> {
    let mut options = options.clone();
    if !meta.is_clustered_counter() {
        if let Some(timestamp) = context.next_timestamp()? {
            options.timestamp = Some(timestamp);
        }
    }
    Ok(options)
}
