//! Turns an entity, its schema and its pending changes into CQL write
//! statements with positional bound values.
//!
//! Bound values always follow the lexical order of their placeholders. For
//! UPDATE and DELETE that is `USING` values, then SET values, then the
//! primary key, then CAS condition values. For INSERT the `USING` clause
//! trails the VALUES list, so its values come last.

use quill_core::codec::{encode_all, encode_entries};
use quill_core::{
    CasCondition, CqlValue, DirtyChange, DirtyChangeSet, Entity, EntityMeta, FieldType,
    FieldValue, InsertStrategy, PropertyMeta, WriteOptions,
};

use crate::error::EngineError;
use crate::statement::GeneratedStatement;

#[derive(Debug, Clone, Copy, Default)]
pub struct StatementGenerator {
    insert_strategy: InsertStrategy,
}

impl StatementGenerator {
    pub fn new(insert_strategy: InsertStrategy) -> Self {
        Self { insert_strategy }
    }

    /// INSERT of every column, plus increments for pending counter deltas.
    pub fn generate_insert(
        &self,
        entity: &dyn Entity,
        meta: &EntityMeta,
        options: &WriteOptions,
    ) -> Result<Vec<GeneratedStatement>, EngineError> {
        let key = primary_key_of(meta, entity)?;
        let mut statements = Vec::new();
        if !meta.is_clustered_counter() {
            statements.push(self.insert_statement(entity, meta, &key, options)?);
        }
        for change in entity.dirty_changes() {
            let property = meta.property(&change.property)?;
            if property.is_counter() {
                statements.push(counter_statement(meta, property, &change.change, &key)?);
            }
        }
        Ok(statements)
    }

    /// Statements for the entity's own pending changes.
    pub fn generate_update(
        &self,
        entity: &dyn Entity,
        meta: &EntityMeta,
        options: &WriteOptions,
    ) -> Result<Vec<GeneratedStatement>, EngineError> {
        self.generate(entity, meta, &entity.dirty_changes(), options)
    }

    /// Whole-value and scalar assignments share one UPDATE; every collection
    /// operation and every counter increment gets a statement of its own.
    pub fn generate(
        &self,
        entity: &dyn Entity,
        meta: &EntityMeta,
        changes: &[DirtyChangeSet],
        options: &WriteOptions,
    ) -> Result<Vec<GeneratedStatement>, EngineError> {
        let key = primary_key_of(meta, entity)?;
        let mut assignments = Vec::new();
        let mut assigned_values = Vec::new();
        let mut collection_statements = Vec::new();
        let mut counter_statements = Vec::new();

        for change in changes {
            let property = meta.property(&change.property)?;
            if property.is_key() {
                return Err(EngineError::usage(format!(
                    "primary key component '{}' cannot be updated",
                    property.name()
                )));
            }
            if property.is_counter() {
                counter_statements.push(counter_statement(meta, property, &change.change, &key)?);
                continue;
            }
            match &change.change {
                DirtyChange::AssignWhole(value) => {
                    assignments.push(format!("{} = ?", property.column()));
                    assigned_values.push(property.encode(value)?);
                }
                change if change.kind().is_index_based() => {
                    collection_statements.push(
                        self.generate_indexed_list_statement(meta, property, change, &key, options)?,
                    );
                }
                change => {
                    let (set, values) = collection_assignment(property, change)?;
                    collection_statements.push(update_statement(meta, &set, values, &key, options)?);
                }
            }
        }

        let mut statements = Vec::new();
        if !assignments.is_empty() {
            statements.push(update_statement(
                meta,
                &assignments.join(", "),
                assigned_values,
                &key,
                options,
            )?);
        }
        statements.extend(collection_statements);
        statements.extend(counter_statements);
        Ok(statements)
    }

    /// Statement for `SET_AT_INDEX` / `REMOVE_AT_INDEX`. The index is part of
    /// the query text, so these statements are always built one by one.
    pub fn generate_indexed_list_statement(
        &self,
        meta: &EntityMeta,
        property: &PropertyMeta,
        change: &DirtyChange,
        key: &[CqlValue],
        options: &WriteOptions,
    ) -> Result<GeneratedStatement, EngineError> {
        expect_shape(property, change, matches!(property.field_type(), FieldType::List(_)))?;
        let column = property.column();
        let (set, values) = match change {
            DirtyChange::SetAtIndex { index, value } => (
                format!("{column}[{index}] = ?"),
                vec![property.codec().element_codec().encode(value)?],
            ),
            DirtyChange::RemoveAtIndex { index } => (format!("{column}[{index}] = null"), Vec::new()),
            other => {
                return Err(EngineError::usage(format!(
                    "{:?} is not an index-based list operation",
                    other.kind()
                )));
            }
        };
        update_statement(meta, &set, values, key, options)
    }

    /// DELETE of the row, and of its counter row when counters live in a
    /// companion table.
    pub fn generate_remove(
        &self,
        meta: &EntityMeta,
        key: &[CqlValue],
        options: &WriteOptions,
    ) -> Result<Vec<GeneratedStatement>, EngineError> {
        let where_clause = where_clause(meta);
        if meta.is_clustered_counter() {
            return Ok(vec![GeneratedStatement::counter(
                format!("DELETE FROM {} WHERE {where_clause}", meta.table_name()),
                key.to_vec(),
                None,
            )]);
        }

        let mut values = Vec::new();
        let mut query = format!("DELETE FROM {}", meta.table_name());
        if let Some(timestamp) = options.timestamp {
            query.push_str(" USING TIMESTAMP ?");
            values.push(CqlValue::BigInt(timestamp));
        }
        query.push_str(&format!(" WHERE {where_clause}"));
        values.extend_from_slice(key);

        let mut statements = vec![GeneratedStatement::new(query, values)];
        if let Some(counter_table) = meta.counter_table() {
            statements.push(GeneratedStatement::counter(
                format!("DELETE FROM {counter_table} WHERE {where_clause}"),
                key.to_vec(),
                None,
            ));
        }
        Ok(statements)
    }

    fn insert_statement(
        &self,
        entity: &dyn Entity,
        meta: &EntityMeta,
        key: &[CqlValue],
        options: &WriteOptions,
    ) -> Result<GeneratedStatement, EngineError> {
        let strategy = meta.insert_strategy().unwrap_or(self.insert_strategy);
        let mut columns: Vec<&str> = meta.primary_key().map(PropertyMeta::column).collect();
        let mut values = key.to_vec();

        for property in meta.non_key_properties().filter(|p| !p.is_counter()) {
            let value = entity.value(property.name()).unwrap_or(&FieldValue::Null);
            if strategy == InsertStrategy::NotNullFields && value.is_null() {
                continue;
            }
            columns.push(property.column());
            values.push(property.encode(value)?);
        }

        let mut query = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            meta.table_name(),
            columns.join(", "),
            vec!["?"; columns.len()].join(", ")
        );
        if options.if_not_exists {
            query.push_str(" IF NOT EXISTS");
        }
        let (using, using_values) = using_clause(options)?;
        query.push_str(&using);
        values.extend(using_values);
        Ok(GeneratedStatement::new(query, values))
    }
}

/// Encoded primary key of an entity, partition components first.
pub fn primary_key_of(meta: &EntityMeta, entity: &dyn Entity) -> Result<Vec<CqlValue>, EngineError> {
    meta.primary_key()
        .map(|property| encode_key(property, entity.value(property.name())))
        .collect()
}

/// Encoded primary key from raw values given in primary-key order.
pub fn primary_key_from(meta: &EntityMeta, values: &[FieldValue]) -> Result<Vec<CqlValue>, EngineError> {
    if values.len() != meta.primary_key_len() {
        return Err(EngineError::usage(format!(
            "{} expects {} primary key components, got {}",
            meta.entity_name(),
            meta.primary_key_len(),
            values.len()
        )));
    }
    meta.primary_key()
        .zip(values)
        .map(|(property, value)| encode_key(property, Some(value)))
        .collect()
}

fn encode_key(property: &PropertyMeta, value: Option<&FieldValue>) -> Result<CqlValue, EngineError> {
    match value {
        Some(value) if !value.is_null() => Ok(property.encode(value)?),
        _ => Err(EngineError::usage(format!(
            "primary key component '{}' has no value",
            property.name()
        ))),
    }
}

fn where_clause(meta: &EntityMeta) -> String {
    meta.primary_key()
        .map(|p| format!("{} = ?", p.column()))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn using_clause(options: &WriteOptions) -> Result<(String, Vec<CqlValue>), EngineError> {
    let mut parts = Vec::new();
    let mut values = Vec::new();
    if let Some(ttl) = options.ttl {
        let ttl = i32::try_from(ttl)
            .map_err(|_| EngineError::usage(format!("TTL of {ttl} seconds does not fit a CQL int")))?;
        parts.push("TTL ?");
        values.push(CqlValue::Int(ttl));
    }
    if let Some(timestamp) = options.timestamp {
        parts.push("TIMESTAMP ?");
        values.push(CqlValue::BigInt(timestamp));
    }
    if parts.is_empty() {
        Ok((String::new(), values))
    } else {
        Ok((format!(" USING {}", parts.join(" AND ")), values))
    }
}

fn cas_clause(meta: &EntityMeta, conditions: &[CasCondition]) -> Result<(String, Vec<CqlValue>), EngineError> {
    if conditions.is_empty() {
        return Ok((String::new(), Vec::new()));
    }
    let mut clauses = Vec::with_capacity(conditions.len());
    let mut values = Vec::with_capacity(conditions.len());
    for condition in conditions {
        let property = meta
            .property_by_column(&condition.column)
            .or_else(|| meta.property(&condition.column).ok())
            .ok_or_else(|| {
                EngineError::usage(format!(
                    "CAS condition on unknown column '{}' of {}",
                    condition.column,
                    meta.entity_name()
                ))
            })?;
        let resolved = CasCondition::new(property.column(), condition.op, condition.value.clone());
        clauses.push(resolved.clause());
        values.push(property.encode(&condition.value)?);
    }
    Ok((format!(" IF {}", clauses.join(" AND ")), values))
}

fn update_statement(
    meta: &EntityMeta,
    set: &str,
    set_values: Vec<CqlValue>,
    key: &[CqlValue],
    options: &WriteOptions,
) -> Result<GeneratedStatement, EngineError> {
    let (using, mut values) = using_clause(options)?;
    let (cas, cas_values) = cas_clause(meta, &options.cas_conditions)?;
    let query = format!(
        "UPDATE {}{using} SET {set} WHERE {}{cas}",
        meta.table_name(),
        where_clause(meta)
    );
    values.extend(set_values);
    values.extend_from_slice(key);
    values.extend(cas_values);
    Ok(GeneratedStatement::new(query, values))
}

fn counter_statement(
    meta: &EntityMeta,
    property: &PropertyMeta,
    change: &DirtyChange,
    key: &[CqlValue],
) -> Result<GeneratedStatement, EngineError> {
    let DirtyChange::AssignWhole(delta) = change else {
        return Err(EngineError::usage(format!(
            "counter '{}' only supports increments, got {:?}",
            property.name(),
            change.kind()
        )));
    };
    let table = match meta.counter_table() {
        Some(table) => table,
        None => meta.table_name(),
    };
    let column = property.column();
    let mut values = vec![property.encode(delta)?];
    values.extend_from_slice(key);
    Ok(GeneratedStatement::counter(
        format!("UPDATE {table} SET {column} = {column} + ? WHERE {}", where_clause(meta)),
        values,
        property.write_consistency(),
    ))
}

/// SET clause and values for a non-indexed collection or map operation.
fn collection_assignment(
    property: &PropertyMeta,
    change: &DirtyChange,
) -> Result<(String, Vec<CqlValue>), EngineError> {
    let column = property.column();
    let element = property.codec().element_codec();
    let field_type = property.field_type();
    let is_list = matches!(field_type, FieldType::List(_));
    let is_set = matches!(field_type, FieldType::Set(_));
    let is_map = matches!(field_type, FieldType::Map(..));

    let assignment = match change {
        DirtyChange::AssignWhole(value) => (format!("{column} = ?"), vec![property.encode(value)?]),
        DirtyChange::AddToSet(values) => {
            expect_shape(property, change, is_set)?;
            (format!("{column} = {column} + ?"), vec![CqlValue::Set(encode_all(element, values)?)])
        }
        DirtyChange::RemoveFromSet(values) => {
            expect_shape(property, change, is_set)?;
            (format!("{column} = {column} - ?"), vec![CqlValue::Set(encode_all(element, values)?)])
        }
        DirtyChange::AppendToList(values) => {
            expect_shape(property, change, is_list)?;
            (format!("{column} = {column} + ?"), vec![CqlValue::List(encode_all(element, values)?)])
        }
        DirtyChange::PrependToList(values) => {
            expect_shape(property, change, is_list)?;
            (format!("{column} = ? + {column}"), vec![CqlValue::List(encode_all(element, values)?)])
        }
        DirtyChange::PutToMap(entries) => {
            expect_shape(property, change, is_map)?;
            let key = map_key_codec(property)?;
            (
                format!("{column} = {column} + ?"),
                vec![CqlValue::Map(encode_entries(key, element, entries)?)],
            )
        }
        DirtyChange::RemoveFromMap(keys) => {
            expect_shape(property, change, is_map)?;
            let key = map_key_codec(property)?;
            (format!("{column} = {column} - ?"), vec![CqlValue::Set(encode_all(key, keys)?)])
        }
        DirtyChange::RemoveCollectionOrMap => (format!("{column} = null"), Vec::new()),
        DirtyChange::SetAtIndex { .. } | DirtyChange::RemoveAtIndex { .. } => {
            return Err(EngineError::usage(format!(
                "{:?} must be generated as an indexed list statement",
                change.kind()
            )));
        }
    };
    Ok(assignment)
}

fn map_key_codec(property: &PropertyMeta) -> Result<&quill_core::codec::SimpleCodec, EngineError> {
    property.codec().key_codec().ok_or_else(|| {
        EngineError::usage(format!("'{}' is not a map", property.name()))
    })
}

fn expect_shape(property: &PropertyMeta, change: &DirtyChange, ok: bool) -> Result<(), EngineError> {
    if ok {
        Ok(())
    } else {
        Err(EngineError::usage(format!(
            "{:?} does not apply to '{}' of type {:?}",
            change.kind(),
            property.name(),
            property.field_type()
        )))
    }
}
