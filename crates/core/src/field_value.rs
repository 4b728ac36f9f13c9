use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// In-memory value of one entity property, before any codec is applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Byte(i8),
    Int(i32),
    BigInt(i64),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    /// Milliseconds since Unix epoch.
    Timestamp(i64),
    /// Enumeration constant, held by variant name.
    Enum(String),
    /// Arbitrary structured value persisted through the JSON codec.
    Object(serde_json::Value),
    /// Counter delta.
    Counter(i64),
    List(Vec<FieldValue>),
    /// Insertion-ordered, duplicate-free.
    Set(Vec<FieldValue>),
    /// Insertion-ordered entries with unique keys.
    Map(Vec<(FieldValue, FieldValue)>),
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Byte(a), Self::Byte(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::BigInt(a), Self::BigInt(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a.total_cmp(b).is_eq(),
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Uuid(a), Self::Uuid(b)) => a == b,
            (Self::Timestamp(a), Self::Timestamp(b)) => a == b,
            (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Counter(a), Self::Counter(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            // Sets compare by membership, not insertion order
            (Self::Set(a), Self::Set(b)) => {
                a.len() == b.len() && a.iter().all(|v| b.contains(v))
            }
            (Self::Map(a), Self::Map(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| {
                        b.iter().any(|(k2, v2)| k == k2 && v == v2)
                    })
            }
            _ => false,
        }
    }
}

impl Eq for FieldValue {}

impl FieldValue {
    /// Build a set, dropping duplicates while keeping first-seen order.
    pub fn set_of(values: impl IntoIterator<Item = FieldValue>) -> Self {
        let mut out: Vec<FieldValue> = Vec::new();
        for value in values {
            if !out.contains(&value) {
                out.push(value);
            }
        }
        FieldValue::Set(out)
    }

    /// Build a map, later entries replacing earlier ones with the same key.
    pub fn map_of(entries: impl IntoIterator<Item = (FieldValue, FieldValue)>) -> Self {
        let mut out: Vec<(FieldValue, FieldValue)> = Vec::new();
        for (key, value) in entries {
            match out.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => out.push((key, value)),
            }
        }
        FieldValue::Map(out)
    }

    pub fn text(s: impl Into<String>) -> Self {
        FieldValue::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_big_int(&self) -> Option<i64> {
        match self {
            FieldValue::BigInt(n) | FieldValue::Counter(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Elements of a list or set; `None` for anything else.
    pub fn elements(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(v) | FieldValue::Set(v) => Some(v),
            _ => None,
        }
    }

    pub fn entries(&self) -> Option<&[(FieldValue, FieldValue)]> {
        match self {
            FieldValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Byte(_) => "byte",
            Self::Int(_) => "int",
            Self::BigInt(_) => "bigint",
            Self::Double(_) => "double",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Uuid(_) => "uuid",
            Self::Timestamp(_) => "timestamp",
            Self::Enum(_) => "enum",
            Self::Object(_) => "object",
            Self::Counter(_) => "counter",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
        }
    }
}
