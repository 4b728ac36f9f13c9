use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::dirty::{merge, ChangeSource, DirtyChange, DirtyChangeSet};
use crate::error::CoreError;
use crate::field_value::FieldValue;

/// An entity instance the engine can read keys and values from, and that
/// interceptors may mutate.
pub trait Entity: ChangeSource + Send {
    fn entity_name(&self) -> &str;

    fn value(&self, property: &str) -> Option<&FieldValue>;

    fn set_value(&mut self, property: &str, value: FieldValue);
}

/// Shared handle to an entity, so post-write interceptors can run after the
/// caller has handed the entity over.
pub type EntityHandle = Arc<Mutex<dyn Entity>>;

pub fn handle<E: Entity + 'static>(entity: E) -> Arc<Mutex<E>> {
    Arc::new(Mutex::new(entity))
}

/// Generic entity that keeps a snapshot of its loaded state and records
/// collection operations as they happen.
#[derive(Debug, Clone, Default)]
pub struct Record {
    entity_name: String,
    values: BTreeMap<String, FieldValue>,
    snapshot: BTreeMap<String, FieldValue>,
    assigned: Vec<String>,
    cleared: Vec<String>,
    ops: Vec<DirtyChangeSet>,
    counters: Vec<(String, i64)>,
}

impl Record {
    /// A transient instance: every value set on it is a change.
    pub fn new(entity_name: &str) -> Self {
        Self {
            entity_name: entity_name.to_string(),
            ..Self::default()
        }
    }

    /// An instance as read from the store; changes are tracked from here.
    pub fn loaded(
        entity_name: &str,
        values: impl IntoIterator<Item = (String, FieldValue)>,
    ) -> Self {
        let values: BTreeMap<String, FieldValue> = values.into_iter().collect();
        Self {
            entity_name: entity_name.to_string(),
            snapshot: values.clone(),
            values,
            ..Self::default()
        }
    }

    pub fn with(mut self, property: &str, value: FieldValue) -> Self {
        self.set(property, value);
        self
    }

    pub fn get(&self, property: &str) -> Option<&FieldValue> {
        self.values.get(property)
    }

    pub fn set(&mut self, property: &str, value: FieldValue) {
        self.values.insert(property.to_string(), value);
        self.ops.retain(|c| c.property != property);
        self.cleared.retain(|p| p != property);
        if !self.assigned.iter().any(|p| p == property) {
            self.assigned.push(property.to_string());
        }
    }

    /// Add `delta` to a counter property.
    pub fn increment(&mut self, property: &str, delta: i64) {
        match self.counters.iter_mut().find(|(p, _)| p == property) {
            Some(slot) => slot.1 += delta,
            None => self.counters.push((property.to_string(), delta)),
        }
    }

    pub fn list_append(&mut self, property: &str, values: Vec<FieldValue>) -> Result<(), CoreError> {
        self.list_mut(property)?.extend(values.iter().cloned());
        self.record(property, DirtyChange::AppendToList(values));
        Ok(())
    }

    pub fn list_prepend(&mut self, property: &str, values: Vec<FieldValue>) -> Result<(), CoreError> {
        let list = self.list_mut(property)?;
        list.splice(0..0, values.iter().cloned());
        self.record(property, DirtyChange::PrependToList(values));
        Ok(())
    }

    pub fn list_set(&mut self, property: &str, index: usize, value: FieldValue) -> Result<(), CoreError> {
        self.indexed_list_mut(property, index)?[index] = value.clone();
        self.record(property, DirtyChange::SetAtIndex { index, value });
        Ok(())
    }

    pub fn list_remove_at(&mut self, property: &str, index: usize) -> Result<(), CoreError> {
        self.indexed_list_mut(property, index)?.remove(index);
        self.record(property, DirtyChange::RemoveAtIndex { index });
        Ok(())
    }

    pub fn set_add(&mut self, property: &str, value: FieldValue) -> Result<(), CoreError> {
        let set = self.set_mut(property)?;
        if !set.contains(&value) {
            set.push(value.clone());
        }
        self.record(property, DirtyChange::AddToSet(vec![value]));
        Ok(())
    }

    pub fn set_remove(&mut self, property: &str, value: FieldValue) -> Result<(), CoreError> {
        self.set_mut(property)?.retain(|v| *v != value);
        self.record(property, DirtyChange::RemoveFromSet(vec![value]));
        Ok(())
    }

    pub fn map_put(&mut self, property: &str, key: FieldValue, value: FieldValue) -> Result<(), CoreError> {
        let entries = self.map_mut(property)?;
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value.clone(),
            None => entries.push((key.clone(), value.clone())),
        }
        self.record(property, DirtyChange::PutToMap(vec![(key, value)]));
        Ok(())
    }

    pub fn map_remove(&mut self, property: &str, key: FieldValue) -> Result<(), CoreError> {
        self.map_mut(property)?.retain(|(k, _)| *k != key);
        self.record(property, DirtyChange::RemoveFromMap(vec![key]));
        Ok(())
    }

    /// Drop the whole collection or map.
    pub fn clear(&mut self, property: &str) {
        self.values.insert(property.to_string(), FieldValue::Null);
        self.ops.retain(|c| c.property != property);
        self.assigned.retain(|p| p != property);
        self.ops
            .push(DirtyChangeSet::new(property, DirtyChange::RemoveCollectionOrMap));
        if !self.cleared.iter().any(|p| p == property) {
            self.cleared.push(property.to_string());
        }
    }

    fn record(&mut self, property: &str, change: DirtyChange) {
        if self.assigned.iter().any(|p| p == property) {
            // The final whole value already includes this operation.
            return;
        }
        if self.cleared.iter().any(|p| p == property) {
            // Clear followed by writes is a replacement of the whole field.
            let current = self.values.get(property).cloned().unwrap_or(FieldValue::Null);
            self.set(property, current);
            return;
        }
        self.ops.push(DirtyChangeSet::new(property, change));
    }

    fn slot(&mut self, property: &str, empty: FieldValue) -> &mut FieldValue {
        let slot = self.values.entry(property.to_string()).or_insert(FieldValue::Null);
        if slot.is_null() {
            *slot = empty;
        }
        slot
    }

    fn list_mut(&mut self, property: &str) -> Result<&mut Vec<FieldValue>, CoreError> {
        match self.slot(property, FieldValue::List(Vec::new())) {
            FieldValue::List(list) => Ok(list),
            other => Err(wrong_shape(property, "list", other)),
        }
    }

    /// The list under `property`, provided `index` is within it. An absent
    /// list is left absent.
    fn indexed_list_mut(&mut self, property: &str, index: usize) -> Result<&mut Vec<FieldValue>, CoreError> {
        match self.values.get(property) {
            Some(FieldValue::List(list)) if index < list.len() => {}
            None | Some(FieldValue::Null) | Some(FieldValue::List(_)) => return Err(out_of_bounds(property, index)),
            Some(other) => return Err(wrong_shape(property, "list", other)),
        }
        match self.values.get_mut(property) {
            Some(FieldValue::List(list)) => Ok(list),
            _ => unreachable!("shape checked above"),
        }
    }

    fn set_mut(&mut self, property: &str) -> Result<&mut Vec<FieldValue>, CoreError> {
        match self.slot(property, FieldValue::Set(Vec::new())) {
            FieldValue::Set(set) => Ok(set),
            other => Err(wrong_shape(property, "set", other)),
        }
    }

    fn map_mut(&mut self, property: &str) -> Result<&mut Vec<(FieldValue, FieldValue)>, CoreError> {
        match self.slot(property, FieldValue::Map(Vec::new())) {
            FieldValue::Map(entries) => Ok(entries),
            other => Err(wrong_shape(property, "map", other)),
        }
    }
}

fn out_of_bounds(property: &str, index: usize) -> CoreError {
    CoreError::InvalidOperation(format!("index {index} out of bounds for list '{property}'"))
}

fn wrong_shape(property: &str, expected: &str, found: &FieldValue) -> CoreError {
    CoreError::InvalidOperation(format!(
        "'{property}' holds a {}, not a {expected}",
        found.kind_name()
    ))
}

impl ChangeSource for Record {
    fn dirty_changes(&self) -> Vec<DirtyChangeSet> {
        let mut changes = Vec::new();
        for property in &self.assigned {
            let current = self.values.get(property).cloned().unwrap_or(FieldValue::Null);
            if self.snapshot.get(property) != Some(&current) {
                changes.push(DirtyChangeSet::new(property, DirtyChange::AssignWhole(current)));
            }
        }
        changes.extend(merge(self.ops.clone()));
        for (property, delta) in &self.counters {
            if *delta != 0 {
                changes.push(DirtyChangeSet::new(
                    property,
                    DirtyChange::AssignWhole(FieldValue::Counter(*delta)),
                ));
            }
        }
        changes
    }

    fn mark_clean(&mut self) {
        self.snapshot = self.values.clone();
        self.assigned.clear();
        self.cleared.clear();
        self.ops.clear();
        self.counters.clear();
    }
}

impl Entity for Record {
    fn entity_name(&self) -> &str {
        &self.entity_name
    }

    fn value(&self, property: &str) -> Option<&FieldValue> {
        self.values.get(property)
    }

    fn set_value(&mut self, property: &str, value: FieldValue) {
        self.set(property, value);
    }
}
