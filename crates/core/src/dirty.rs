//! Pending mutations of one entity instance, as seen by the statement
//! generator.

use serde::{Deserialize, Serialize};

use crate::field_value::FieldValue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirtyChange {
    /// Replace the whole field. Also used for scalar properties and, with a
    /// `FieldValue::Counter` payload, for counter increments.
    AssignWhole(FieldValue),
    AddToSet(Vec<FieldValue>),
    RemoveFromSet(Vec<FieldValue>),
    AppendToList(Vec<FieldValue>),
    PrependToList(Vec<FieldValue>),
    SetAtIndex { index: usize, value: FieldValue },
    RemoveAtIndex { index: usize },
    PutToMap(Vec<(FieldValue, FieldValue)>),
    RemoveFromMap(Vec<FieldValue>),
    RemoveCollectionOrMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    AssignWhole,
    AddToSet,
    RemoveFromSet,
    AppendToList,
    PrependToList,
    SetAtIndex,
    RemoveAtIndex,
    PutToMap,
    RemoveFromMap,
    RemoveCollectionOrMap,
}

impl ChangeKind {
    /// Operations whose target index is embedded in the query text.
    pub fn is_index_based(&self) -> bool {
        matches!(self, Self::SetAtIndex | Self::RemoveAtIndex)
    }

    pub fn is_whole(&self) -> bool {
        matches!(self, Self::AssignWhole | Self::RemoveCollectionOrMap)
    }
}

impl DirtyChange {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::AssignWhole(_) => ChangeKind::AssignWhole,
            Self::AddToSet(_) => ChangeKind::AddToSet,
            Self::RemoveFromSet(_) => ChangeKind::RemoveFromSet,
            Self::AppendToList(_) => ChangeKind::AppendToList,
            Self::PrependToList(_) => ChangeKind::PrependToList,
            Self::SetAtIndex { .. } => ChangeKind::SetAtIndex,
            Self::RemoveAtIndex { .. } => ChangeKind::RemoveAtIndex,
            Self::PutToMap(_) => ChangeKind::PutToMap,
            Self::RemoveFromMap(_) => ChangeKind::RemoveFromMap,
            Self::RemoveCollectionOrMap => ChangeKind::RemoveCollectionOrMap,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtyChangeSet {
    /// Logical property name.
    pub property: String,
    pub change: DirtyChange,
}

impl DirtyChangeSet {
    pub fn new(property: &str, change: DirtyChange) -> Self {
        Self {
            property: property.to_string(),
            change,
        }
    }

    pub fn kind(&self) -> ChangeKind {
        self.change.kind()
    }
}

/// Anything able to report its pending changes. The generator only ever
/// sees this capability, never the tracking mechanism behind it.
pub trait ChangeSource {
    /// Pending changes, already merged, in the order they should be applied.
    fn dirty_changes(&self) -> Vec<DirtyChangeSet>;

    /// Adopt the current state as the new snapshot.
    fn mark_clean(&mut self);
}

/// Collapse raw observed operations into the minimal equivalent sequence.
///
/// Properties keep the order of their first appearance. Per property:
/// `AssignWhole` carries the final value and supersedes every other change;
/// a `RemoveCollectionOrMap` discards what came before it; set and map
/// operations fold into at most one add/put and one remove; list operations
/// are replayed unchanged, in observed order.
pub fn merge(changes: Vec<DirtyChangeSet>) -> Vec<DirtyChangeSet> {
    let mut order: Vec<String> = Vec::new();
    for set in &changes {
        if !order.contains(&set.property) {
            order.push(set.property.clone());
        }
    }

    let mut merged = Vec::new();
    for property in order {
        let ops: Vec<DirtyChange> = changes
            .iter()
            .filter(|c| c.property == property)
            .map(|c| c.change.clone())
            .collect();
        for change in merge_field(ops) {
            merged.push(DirtyChangeSet::new(&property, change));
        }
    }
    merged
}

fn merge_field(ops: Vec<DirtyChange>) -> Vec<DirtyChange> {
    if let Some(last_assign) = ops
        .iter()
        .rev()
        .find(|op| matches!(op, DirtyChange::AssignWhole(_)))
    {
        return vec![last_assign.clone()];
    }

    let start = ops
        .iter()
        .rposition(|op| op.kind() == ChangeKind::RemoveCollectionOrMap);
    let mut out = Vec::new();
    let tail = match start {
        Some(i) => {
            out.push(DirtyChange::RemoveCollectionOrMap);
            &ops[i + 1..]
        }
        None => &ops[..],
    };

    let mut set_adds: Vec<FieldValue> = Vec::new();
    let mut set_removes: Vec<FieldValue> = Vec::new();
    let mut map_puts: Vec<(FieldValue, FieldValue)> = Vec::new();
    let mut map_removes: Vec<FieldValue> = Vec::new();

    for op in tail {
        match op {
            DirtyChange::AddToSet(values) => {
                for v in values {
                    set_removes.retain(|r| r != v);
                    push_unique(&mut set_adds, v);
                }
            }
            DirtyChange::RemoveFromSet(values) => {
                for v in values {
                    set_adds.retain(|a| a != v);
                    push_unique(&mut set_removes, v);
                }
            }
            DirtyChange::PutToMap(entries) => {
                for (k, v) in entries {
                    map_removes.retain(|r| r != k);
                    match map_puts.iter_mut().find(|(pk, _)| pk == k) {
                        Some(slot) => slot.1 = v.clone(),
                        None => map_puts.push((k.clone(), v.clone())),
                    }
                }
            }
            DirtyChange::RemoveFromMap(keys) => {
                for k in keys {
                    map_puts.retain(|(pk, _)| pk != k);
                    push_unique(&mut map_removes, k);
                }
            }
            list_op => out.push(list_op.clone()),
        }
    }

    if !set_adds.is_empty() {
        out.push(DirtyChange::AddToSet(set_adds));
    }
    if !set_removes.is_empty() {
        out.push(DirtyChange::RemoveFromSet(set_removes));
    }
    if !map_puts.is_empty() {
        out.push(DirtyChange::PutToMap(map_puts));
    }
    if !map_removes.is_empty() {
        out.push(DirtyChange::RemoveFromMap(map_removes));
    }
    out
}

fn push_unique(values: &mut Vec<FieldValue>, value: &FieldValue) {
    if !values.contains(value) {
        values.push(value.clone());
    }
}
