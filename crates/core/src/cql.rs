use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Column type as declared by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CqlType {
    Boolean,
    TinyInt,
    Int,
    BigInt,
    Counter,
    Double,
    Text,
    Blob,
    Uuid,
    TimeUuid,
    Timestamp,
    List(Box<CqlType>),
    Set(Box<CqlType>),
    Map(Box<CqlType>, Box<CqlType>),
}

impl CqlType {
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::List(_) | Self::Set(_) | Self::Map(..))
    }
}

impl fmt::Display for CqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => f.write_str("boolean"),
            Self::TinyInt => f.write_str("tinyint"),
            Self::Int => f.write_str("int"),
            Self::BigInt => f.write_str("bigint"),
            Self::Counter => f.write_str("counter"),
            Self::Double => f.write_str("double"),
            Self::Text => f.write_str("text"),
            Self::Blob => f.write_str("blob"),
            Self::Uuid => f.write_str("uuid"),
            Self::TimeUuid => f.write_str("timeuuid"),
            Self::Timestamp => f.write_str("timestamp"),
            Self::List(e) => write!(f, "list<{e}>"),
            Self::Set(e) => write!(f, "set<{e}>"),
            Self::Map(k, v) => write!(f, "map<{k}, {v}>"),
        }
    }
}

/// Wire-representable value, as bound into a statement or read back from a row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CqlValue {
    Null,
    Boolean(bool),
    TinyInt(i8),
    Int(i32),
    BigInt(i64),
    Counter(i64),
    Double(f64),
    Text(String),
    Blob(Vec<u8>),
    Uuid(Uuid),
    TimeUuid(Uuid),
    Timestamp(i64),
    List(Vec<CqlValue>),
    Set(Vec<CqlValue>),
    Map(Vec<(CqlValue, CqlValue)>),
}

impl PartialEq for CqlValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::TinyInt(a), Self::TinyInt(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::BigInt(a), Self::BigInt(b)) => a == b,
            (Self::Counter(a), Self::Counter(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a.total_cmp(b).is_eq(),
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Blob(a), Self::Blob(b)) => a == b,
            (Self::Uuid(a), Self::Uuid(b)) => a == b,
            (Self::TimeUuid(a), Self::TimeUuid(b)) => a == b,
            (Self::Timestamp(a), Self::Timestamp(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Set(a), Self::Set(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for CqlValue {}

impl CqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CqlValue::Null)
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            CqlValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this value may be stored in a column of type `ty`. Null conforms to every type.
    pub fn conforms_to(&self, ty: &CqlType) -> bool {
        match (self, ty) {
            (Self::Null, _) => true,
            (Self::Boolean(_), CqlType::Boolean)
            | (Self::TinyInt(_), CqlType::TinyInt)
            | (Self::Int(_), CqlType::Int)
            | (Self::BigInt(_), CqlType::BigInt)
            | (Self::Counter(_) | Self::BigInt(_), CqlType::Counter)
            | (Self::Double(_), CqlType::Double)
            | (Self::Text(_), CqlType::Text)
            | (Self::Blob(_), CqlType::Blob)
            | (Self::Uuid(_), CqlType::Uuid)
            | (Self::TimeUuid(_) | Self::Uuid(_), CqlType::TimeUuid)
            | (Self::Timestamp(_), CqlType::Timestamp) => true,
            (Self::List(items), CqlType::List(e)) | (Self::Set(items), CqlType::Set(e)) => {
                items.iter().all(|v| v.conforms_to(e))
            }
            (Self::Map(entries), CqlType::Map(k, v)) => entries
                .iter()
                .all(|(key, value)| key.conforms_to(k) && value.conforms_to(v)),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_types_render_as_cql() {
        let ty = CqlType::Map(Box::new(CqlType::Text), Box::new(CqlType::List(Box::new(CqlType::Int))));
        assert_eq!(ty.to_string(), "map<text, list<int>>");
    }

    #[test]
    fn conformance_checks_elements() {
        let ty = CqlType::Set(Box::new(CqlType::Text));
        assert!(CqlValue::Set(vec![CqlValue::Text("a".into())]).conforms_to(&ty));
        assert!(!CqlValue::Set(vec![CqlValue::Int(1)]).conforms_to(&ty));
        assert!(CqlValue::Null.conforms_to(&ty));
    }
}
