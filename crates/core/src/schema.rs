//! Static description of entity types: table, key structure and per-property
//! codecs. Built once at bootstrap and shared read-only afterwards.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::{Codec, CodecFactory, CodecHints, EnumEncoding, FieldType};
use crate::config::InsertStrategy;
use crate::consistency::ConsistencyLevel;
use crate::cql::{CqlType, CqlValue};
use crate::entity::Entity;
use crate::error::CoreError;
use crate::field_value::FieldValue;
use crate::interceptor::{Event, Interceptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyRole {
    Plain,
    Counter,
    PartitionKey,
    ClusteringKey,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusteringOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct PropertyMeta {
    name: String,
    column: String,
    role: PropertyRole,
    codec: Codec,
    write_consistency: Option<ConsistencyLevel>,
}

impl PropertyMeta {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn role(&self) -> PropertyRole {
        self.role
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn field_type(&self) -> &FieldType {
        self.codec.source_type()
    }

    pub fn is_counter(&self) -> bool {
        self.role == PropertyRole::Counter
    }

    pub fn is_key(&self) -> bool {
        matches!(self.role, PropertyRole::PartitionKey | PropertyRole::ClusteringKey)
    }

    pub fn write_consistency(&self) -> Option<ConsistencyLevel> {
        self.write_consistency
    }

    /// Store column type: counters map to counter columns, everything else
    /// to the codec's target type.
    pub fn column_type(&self) -> CqlType {
        if self.is_counter() {
            CqlType::Counter
        } else {
            self.codec.target_type()
        }
    }

    pub fn encode(&self, value: &FieldValue) -> Result<CqlValue, CoreError> {
        self.codec.encode(value)
    }

    pub fn decode(&self, value: &CqlValue) -> Result<FieldValue, CoreError> {
        self.codec.decode(value)
    }
}

/// One declared property, before its codec is resolved.
#[derive(Debug, Clone)]
pub struct PropertyDecl {
    name: String,
    column: Option<String>,
    field_type: FieldType,
    role: PropertyRole,
    hints: CodecHints,
    write_consistency: Option<ConsistencyLevel>,
}

impl PropertyDecl {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        let role = if field_type == FieldType::Counter {
            PropertyRole::Counter
        } else {
            PropertyRole::Plain
        };
        Self {
            name: name.to_string(),
            column: None,
            field_type,
            role,
            hints: CodecHints::default(),
            write_consistency: None,
        }
    }

    pub fn column(mut self, column: &str) -> Self {
        self.column = Some(column.to_string());
        self
    }

    pub fn enum_encoding(mut self, encoding: EnumEncoding) -> Self {
        self.hints.enum_encoding = Some(encoding);
        self
    }

    pub fn key_enum_encoding(mut self, encoding: EnumEncoding) -> Self {
        self.hints.key_enum_encoding = Some(encoding);
        self
    }

    pub fn time_uuid(mut self) -> Self {
        self.hints.time_uuid = true;
        self
    }

    pub fn write_consistency(mut self, level: ConsistencyLevel) -> Self {
        self.write_consistency = Some(level);
        self
    }

    fn with_role(mut self, role: PropertyRole) -> Self {
        self.role = role;
        self
    }
}

pub struct EntityMeta {
    entity_name: String,
    table_name: String,
    counter_table: Option<String>,
    partition_keys: Vec<String>,
    clustering_keys: Vec<(String, ClusteringOrder)>,
    properties: BTreeMap<String, PropertyMeta>,
    declaration_order: Vec<String>,
    clustered_counter: bool,
    read_consistency: Option<ConsistencyLevel>,
    write_consistency: Option<ConsistencyLevel>,
    insert_strategy: Option<InsertStrategy>,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl EntityMeta {
    pub fn builder(entity_name: &str, table_name: &str) -> EntityMetaBuilder {
        EntityMetaBuilder::new(entity_name, table_name)
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Companion table holding the counter columns of an entity that is not
    /// itself a counter table.
    pub fn counter_table(&self) -> Option<&str> {
        self.counter_table.as_deref()
    }

    /// True when every non-key column is a counter.
    pub fn is_clustered_counter(&self) -> bool {
        self.clustered_counter
    }

    pub fn read_consistency(&self) -> Option<ConsistencyLevel> {
        self.read_consistency
    }

    pub fn write_consistency(&self) -> Option<ConsistencyLevel> {
        self.write_consistency
    }

    pub fn insert_strategy(&self) -> Option<InsertStrategy> {
        self.insert_strategy
    }

    pub fn property(&self, name: &str) -> Result<&PropertyMeta, CoreError> {
        self.properties
            .get(name)
            .ok_or_else(|| CoreError::UnknownProperty {
                entity: self.entity_name.clone(),
                property: name.to_string(),
            })
    }

    pub fn property_by_column(&self, column: &str) -> Option<&PropertyMeta> {
        self.properties.values().find(|p| p.column == column)
    }

    /// All properties in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = &PropertyMeta> {
        self.declaration_order
            .iter()
            .filter_map(|name| self.properties.get(name))
    }

    pub fn partition_keys(&self) -> impl Iterator<Item = &PropertyMeta> {
        self.partition_keys
            .iter()
            .filter_map(|name| self.properties.get(name))
    }

    pub fn clustering_keys(&self) -> impl Iterator<Item = (&PropertyMeta, ClusteringOrder)> {
        self.clustering_keys
            .iter()
            .filter_map(|(name, order)| self.properties.get(name).map(|p| (p, *order)))
    }

    /// Partition-key components first, then clustering-key components, each
    /// in declaration order. WHERE clauses and key bindings follow this order.
    pub fn primary_key(&self) -> impl Iterator<Item = &PropertyMeta> {
        self.partition_keys()
            .chain(self.clustering_keys().map(|(p, _)| p))
    }

    pub fn primary_key_len(&self) -> usize {
        self.partition_keys.len() + self.clustering_keys.len()
    }

    pub fn non_key_properties(&self) -> impl Iterator<Item = &PropertyMeta> {
        self.properties().filter(|p| !p.is_key())
    }

    pub fn counter_properties(&self) -> impl Iterator<Item = &PropertyMeta> {
        self.properties().filter(|p| p.is_counter())
    }

    pub fn has_counters(&self) -> bool {
        self.properties.values().any(PropertyMeta::is_counter)
    }

    pub fn has_interceptors_for(&self, event: Event) -> bool {
        self.interceptors.iter().any(|i| i.events().contains(&event))
    }

    /// Run every interceptor registered for `event`, in registration order.
    pub fn intercept(&self, entity: &mut dyn Entity, event: Event) {
        for interceptor in &self.interceptors {
            if interceptor.events().contains(&event) {
                interceptor.on_event(entity);
            }
        }
    }
}

impl fmt::Debug for EntityMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityMeta")
            .field("entity_name", &self.entity_name)
            .field("table_name", &self.table_name)
            .field("partition_keys", &self.partition_keys)
            .field("clustering_keys", &self.clustering_keys)
            .field("properties", &self.declaration_order)
            .field("clustered_counter", &self.clustered_counter)
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

pub struct EntityMetaBuilder {
    entity_name: String,
    table_name: String,
    counter_table: Option<String>,
    decls: Vec<PropertyDecl>,
    clustering_orders: BTreeMap<String, ClusteringOrder>,
    read_consistency: Option<ConsistencyLevel>,
    write_consistency: Option<ConsistencyLevel>,
    insert_strategy: Option<InsertStrategy>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    codecs: CodecFactory,
}

impl EntityMetaBuilder {
    pub fn new(entity_name: &str, table_name: &str) -> Self {
        Self {
            entity_name: entity_name.to_string(),
            table_name: table_name.to_string(),
            counter_table: None,
            decls: Vec::new(),
            clustering_orders: BTreeMap::new(),
            read_consistency: None,
            write_consistency: None,
            insert_strategy: None,
            interceptors: Vec::new(),
            codecs: CodecFactory::default(),
        }
    }

    pub fn partition_key(mut self, name: &str, field_type: FieldType) -> Self {
        self.decls
            .push(PropertyDecl::new(name, field_type).with_role(PropertyRole::PartitionKey));
        self
    }

    pub fn clustering_key(mut self, name: &str, field_type: FieldType, order: ClusteringOrder) -> Self {
        self.decls
            .push(PropertyDecl::new(name, field_type).with_role(PropertyRole::ClusteringKey));
        self.clustering_orders.insert(name.to_string(), order);
        self
    }

    pub fn property(mut self, name: &str, field_type: FieldType) -> Self {
        self.decls.push(PropertyDecl::new(name, field_type));
        self
    }

    pub fn counter(mut self, name: &str) -> Self {
        self.decls.push(PropertyDecl::new(name, FieldType::Counter));
        self
    }

    pub fn declare(mut self, decl: PropertyDecl) -> Self {
        self.decls.push(decl);
        self
    }

    pub fn counter_table(mut self, table: &str) -> Self {
        self.counter_table = Some(table.to_string());
        self
    }

    pub fn consistency(mut self, read: ConsistencyLevel, write: ConsistencyLevel) -> Self {
        self.read_consistency = Some(read);
        self.write_consistency = Some(write);
        self
    }

    pub fn insert_strategy(mut self, strategy: InsertStrategy) -> Self {
        self.insert_strategy = Some(strategy);
        self
    }

    pub fn interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn codecs(mut self, codecs: CodecFactory) -> Self {
        self.codecs = codecs;
        self
    }

    pub fn build(self) -> Result<EntityMeta, CoreError> {
        let entity = self.entity_name.as_str();
        let mut properties = BTreeMap::new();
        let mut declaration_order = Vec::new();
        let mut columns = BTreeSet::new();
        let mut partition_keys = Vec::new();
        let mut clustering_keys = Vec::new();

        for decl in &self.decls {
            let owner = format!("{entity}.{}", decl.name);
            let column = decl.column.clone().unwrap_or_else(|| decl.name.clone());

            if properties.contains_key(&decl.name) {
                return Err(CoreError::schema(entity, format!("duplicate property '{}'", decl.name)));
            }
            if !columns.insert(column.clone()) {
                return Err(CoreError::schema(entity, format!("duplicate column '{column}'")));
            }
            match decl.role {
                PropertyRole::PartitionKey | PropertyRole::ClusteringKey => {
                    if decl.field_type.is_collection() || decl.field_type == FieldType::Counter {
                        return Err(CoreError::schema(
                            &owner,
                            "primary key components must be simple, non-counter values",
                        ));
                    }
                }
                PropertyRole::Counter if decl.field_type != FieldType::Counter => {
                    return Err(CoreError::schema(&owner, "counter role requires a counter type"));
                }
                PropertyRole::Plain if decl.field_type == FieldType::Counter => {
                    return Err(CoreError::schema(&owner, "counter type requires the counter role"));
                }
                _ => {}
            }

            let codec = self.codecs.codec_for(&owner, &decl.field_type, decl.hints)?;
            match decl.role {
                PropertyRole::PartitionKey => partition_keys.push(decl.name.clone()),
                PropertyRole::ClusteringKey => clustering_keys.push((
                    decl.name.clone(),
                    self.clustering_orders.get(&decl.name).copied().unwrap_or_default(),
                )),
                PropertyRole::Plain | PropertyRole::Counter => {}
            }
            declaration_order.push(decl.name.clone());
            properties.insert(
                decl.name.clone(),
                PropertyMeta {
                    name: decl.name.clone(),
                    column,
                    role: decl.role,
                    codec,
                    write_consistency: decl.write_consistency,
                },
            );
        }

        if partition_keys.is_empty() {
            return Err(CoreError::schema(entity, "missing partition key"));
        }

        let non_key: Vec<&PropertyMeta> = properties.values().filter(|p| !p.is_key()).collect();
        let counters = non_key.iter().filter(|p| p.is_counter()).count();
        let clustered_counter = counters > 0 && counters == non_key.len();
        let counter_table = if counters > 0 && !clustered_counter {
            Some(
                self.counter_table
                    .unwrap_or_else(|| format!("{}_counters", self.table_name)),
            )
        } else {
            None
        };

        debug!(
            entity,
            table = %self.table_name,
            properties = declaration_order.len(),
            clustered_counter,
            "built entity meta"
        );

        Ok(EntityMeta {
            entity_name: self.entity_name,
            table_name: self.table_name,
            counter_table,
            partition_keys,
            clustering_keys,
            properties,
            declaration_order,
            clustered_counter,
            read_consistency: self.read_consistency,
            write_consistency: self.write_consistency,
            insert_strategy: self.insert_strategy,
            interceptors: self.interceptors,
        })
    }
}

/// Every registered entity type, keyed by entity name.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    metas: BTreeMap<String, Arc<EntityMeta>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, meta: EntityMeta) -> Result<Arc<EntityMeta>, CoreError> {
        if self.metas.contains_key(meta.entity_name()) {
            return Err(CoreError::schema(meta.entity_name(), "entity registered twice"));
        }
        let meta = Arc::new(meta);
        self.metas
            .insert(meta.entity_name().to_string(), Arc::clone(&meta));
        Ok(meta)
    }

    pub fn get(&self, entity_name: &str) -> Option<&Arc<EntityMeta>> {
        self.metas.get(entity_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<EntityMeta>> {
        self.metas.values()
    }
}
