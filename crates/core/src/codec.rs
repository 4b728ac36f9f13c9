//! Per-property transcoders between [`FieldValue`] and [`CqlValue`].
//!
//! A codec is chosen once per property when the schema is built, so an
//! unsupported declaration fails at bootstrap and never at write time.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::cql::{CqlType, CqlValue};
use crate::error::CoreError;
use crate::field_value::FieldValue;

/// Declared in-memory type of a property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Boolean,
    Byte,
    Bytes,
    Int,
    BigInt,
    Double,
    Text,
    Uuid,
    Timestamp,
    Counter,
    Enum { name: String, variants: Vec<String> },
    Object { type_name: String },
    List(Box<FieldType>),
    Set(Box<FieldType>),
    Map(Box<FieldType>, Box<FieldType>),
}

impl FieldType {
    pub fn list(element: FieldType) -> Self {
        FieldType::List(Box::new(element))
    }

    pub fn set(element: FieldType) -> Self {
        FieldType::Set(Box::new(element))
    }

    pub fn map(key: FieldType, value: FieldType) -> Self {
        FieldType::Map(Box::new(key), Box::new(value))
    }

    pub fn enumeration(name: &str, variants: &[&str]) -> Self {
        FieldType::Enum {
            name: name.to_string(),
            variants: variants.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn object(type_name: &str) -> Self {
        FieldType::Object {
            type_name: type_name.to_string(),
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Self::List(_) | Self::Set(_) | Self::Map(..))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnumEncoding {
    Name,
    Ordinal,
}

/// Declaration hints that steer codec selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodecHints {
    /// Applies to the value, or to the elements/values of a collection.
    pub enum_encoding: Option<EnumEncoding>,
    /// Applies to map keys.
    pub key_enum_encoding: Option<EnumEncoding>,
    pub time_uuid: bool,
}

/// Pluggable JSON mapper used for values the store cannot represent natively.
pub trait ObjectMapper: fmt::Debug + Send + Sync {
    fn to_json(&self, type_name: &str, value: &serde_json::Value) -> Result<String, CoreError>;
    fn from_json(&self, type_name: &str, json: &str) -> Result<serde_json::Value, CoreError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonObjectMapper;

impl ObjectMapper for JsonObjectMapper {
    fn to_json(&self, type_name: &str, value: &serde_json::Value) -> Result<String, CoreError> {
        serde_json::to_string(value)
            .map_err(|e| CoreError::Serialization(format!("{type_name}: {e}")))
    }

    fn from_json(&self, type_name: &str, json: &str) -> Result<serde_json::Value, CoreError> {
        serde_json::from_str(json)
            .map_err(|e| CoreError::Serialization(format!("{type_name}: {e}")))
    }
}

/// Codec for a single, non-collection value.
#[derive(Debug, Clone)]
pub enum SimpleCodec {
    Byte,
    ByteArray,
    /// Pass-through for types the store represents natively.
    Native(CqlType),
    Counter,
    EnumName(Vec<String>),
    EnumOrdinal(Vec<String>),
    Json {
        type_name: String,
        mapper: Arc<dyn ObjectMapper>,
    },
}

impl SimpleCodec {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::ByteArray => "byte-array",
            Self::Native(_) => "native",
            Self::Counter => "counter",
            Self::EnumName(_) => "enum-name",
            Self::EnumOrdinal(_) => "enum-ordinal",
            Self::Json { .. } => "json",
        }
    }

    pub fn target_type(&self) -> CqlType {
        match self {
            Self::Byte | Self::ByteArray => CqlType::Blob,
            Self::Native(ty) => ty.clone(),
            Self::Counter => CqlType::BigInt,
            Self::EnumName(_) | Self::Json { .. } => CqlType::Text,
            Self::EnumOrdinal(_) => CqlType::Int,
        }
    }

    fn mismatch(&self, value: impl fmt::Debug, reason: impl Into<String>) -> CoreError {
        CoreError::Transcoding {
            codec: self.name(),
            value: format!("{value:?}"),
            reason: reason.into(),
        }
    }

    pub fn encode(&self, value: &FieldValue) -> Result<CqlValue, CoreError> {
        if value.is_null() {
            return Ok(CqlValue::Null);
        }
        match (self, value) {
            (Self::Byte, FieldValue::Byte(b)) => Ok(CqlValue::Blob(vec![*b as u8])),
            (Self::ByteArray, FieldValue::Bytes(bytes)) => Ok(CqlValue::Blob(bytes.clone())),
            (Self::Native(ty), _) => encode_native(ty, value)
                .ok_or_else(|| self.mismatch(value, format!("expected a {ty} value"))),
            (Self::Counter, FieldValue::Counter(n) | FieldValue::BigInt(n)) => {
                Ok(CqlValue::BigInt(*n))
            }
            (Self::EnumName(variants), FieldValue::Enum(name)) => {
                if variants.contains(name) {
                    Ok(CqlValue::Text(name.clone()))
                } else {
                    Err(self.mismatch(value, "unknown enum constant"))
                }
            }
            (Self::EnumOrdinal(variants), FieldValue::Enum(name)) => {
                let ordinal = variants
                    .iter()
                    .position(|v| v == name)
                    .ok_or_else(|| self.mismatch(value, "unknown enum constant"))?;
                Ok(CqlValue::Int(ordinal as i32))
            }
            (Self::Json { type_name, mapper }, FieldValue::Object(object)) => {
                Ok(CqlValue::Text(mapper.to_json(type_name, object)?))
            }
            _ => Err(self.mismatch(value, format!("unexpected {} value", value.kind_name()))),
        }
    }

    pub fn decode(&self, value: &CqlValue) -> Result<FieldValue, CoreError> {
        if value.is_null() {
            return Ok(FieldValue::Null);
        }
        match (self, value) {
            (Self::Byte, CqlValue::Blob(bytes)) => match bytes.as_slice() {
                [b] => Ok(FieldValue::Byte(*b as i8)),
                _ => Err(self.mismatch(value, "expected exactly one byte")),
            },
            (Self::ByteArray, CqlValue::Blob(bytes)) => Ok(FieldValue::Bytes(bytes.clone())),
            (Self::Native(ty), _) => decode_native(ty, value)
                .ok_or_else(|| self.mismatch(value, format!("expected a {ty} value"))),
            (Self::Counter, CqlValue::BigInt(n) | CqlValue::Counter(n)) => {
                Ok(FieldValue::Counter(*n))
            }
            (Self::EnumName(variants), CqlValue::Text(name)) => {
                if variants.contains(name) {
                    Ok(FieldValue::Enum(name.clone()))
                } else {
                    Err(self.mismatch(value, "unknown enum constant"))
                }
            }
            (Self::EnumOrdinal(variants), CqlValue::Int(ordinal)) => usize::try_from(*ordinal)
                .ok()
                .and_then(|i| variants.get(i))
                .map(|name| FieldValue::Enum(name.clone()))
                .ok_or_else(|| self.mismatch(value, "ordinal out of range")),
            (Self::Json { type_name, mapper }, CqlValue::Text(json)) => {
                Ok(FieldValue::Object(mapper.from_json(type_name, json)?))
            }
            _ => Err(self.mismatch(value, "unexpected wire value")),
        }
    }
}

fn encode_native(ty: &CqlType, value: &FieldValue) -> Option<CqlValue> {
    let encoded = match (ty, value) {
        (CqlType::Boolean, FieldValue::Boolean(b)) => CqlValue::Boolean(*b),
        (CqlType::Int, FieldValue::Int(n)) => CqlValue::Int(*n),
        (CqlType::BigInt, FieldValue::BigInt(n)) => CqlValue::BigInt(*n),
        (CqlType::Double, FieldValue::Double(d)) => CqlValue::Double(*d),
        (CqlType::Text, FieldValue::Text(s)) => CqlValue::Text(s.clone()),
        (CqlType::Uuid, FieldValue::Uuid(u)) => CqlValue::Uuid(*u),
        (CqlType::TimeUuid, FieldValue::Uuid(u)) => CqlValue::TimeUuid(*u),
        (CqlType::Timestamp, FieldValue::Timestamp(ms)) => CqlValue::Timestamp(*ms),
        _ => return None,
    };
    Some(encoded)
}

fn decode_native(ty: &CqlType, value: &CqlValue) -> Option<FieldValue> {
    let decoded = match (ty, value) {
        (CqlType::Boolean, CqlValue::Boolean(b)) => FieldValue::Boolean(*b),
        (CqlType::Int, CqlValue::Int(n)) => FieldValue::Int(*n),
        (CqlType::BigInt, CqlValue::BigInt(n)) => FieldValue::BigInt(*n),
        (CqlType::Double, CqlValue::Double(d)) => FieldValue::Double(*d),
        (CqlType::Text, CqlValue::Text(s)) => FieldValue::Text(s.clone()),
        (CqlType::Uuid | CqlType::TimeUuid, CqlValue::Uuid(u) | CqlValue::TimeUuid(u)) => {
            FieldValue::Uuid(*u)
        }
        (CqlType::Timestamp, CqlValue::Timestamp(ms)) => FieldValue::Timestamp(*ms),
        _ => return None,
    };
    Some(decoded)
}

#[derive(Debug, Clone)]
enum Shape {
    Simple(SimpleCodec),
    List(SimpleCodec),
    Set(SimpleCodec),
    Map { key: SimpleCodec, value: SimpleCodec },
}

/// Codec bound to one property: a simple codec, or a collection/map codec
/// that applies its element codec(s) element-wise.
#[derive(Debug, Clone)]
pub struct Codec {
    source: FieldType,
    shape: Shape,
}

impl Codec {
    pub fn source_type(&self) -> &FieldType {
        &self.source
    }

    pub fn target_type(&self) -> CqlType {
        match &self.shape {
            Shape::Simple(c) => c.target_type(),
            Shape::List(c) => CqlType::List(Box::new(c.target_type())),
            Shape::Set(c) => CqlType::Set(Box::new(c.target_type())),
            Shape::Map { key, value } => {
                CqlType::Map(Box::new(key.target_type()), Box::new(value.target_type()))
            }
        }
    }

    /// Codec for single elements: the value codec itself, or the element/value
    /// codec of a collection or map.
    pub fn element_codec(&self) -> &SimpleCodec {
        match &self.shape {
            Shape::Simple(c) | Shape::List(c) | Shape::Set(c) => c,
            Shape::Map { value, .. } => value,
        }
    }

    /// Key codec of a map codec; `None` for any other shape.
    pub fn key_codec(&self) -> Option<&SimpleCodec> {
        match &self.shape {
            Shape::Map { key, .. } => Some(key),
            _ => None,
        }
    }

    pub fn encode(&self, value: &FieldValue) -> Result<CqlValue, CoreError> {
        if value.is_null() {
            return Ok(CqlValue::Null);
        }
        match (&self.shape, value) {
            (Shape::Simple(c), _) => c.encode(value),
            (Shape::List(c), FieldValue::List(items)) => {
                Ok(CqlValue::List(encode_all(c, items)?))
            }
            (Shape::Set(c), FieldValue::Set(items)) => Ok(CqlValue::Set(encode_all(c, items)?)),
            (Shape::Map { key, value: val }, FieldValue::Map(entries)) => {
                Ok(CqlValue::Map(encode_entries(key, val, entries)?))
            }
            _ => Err(CoreError::Transcoding {
                codec: "collection",
                value: format!("{value:?}"),
                reason: format!("does not match declared type {:?}", self.source),
            }),
        }
    }

    pub fn decode(&self, value: &CqlValue) -> Result<FieldValue, CoreError> {
        if value.is_null() {
            return Ok(FieldValue::Null);
        }
        match (&self.shape, value) {
            (Shape::Simple(c), _) => c.decode(value),
            (Shape::List(c), CqlValue::List(items)) => Ok(FieldValue::List(
                items.iter().map(|v| c.decode(v)).collect::<Result<_, _>>()?,
            )),
            (Shape::Set(c), CqlValue::Set(items)) => Ok(FieldValue::Set(
                items.iter().map(|v| c.decode(v)).collect::<Result<_, _>>()?,
            )),
            (Shape::Map { key, value: val }, CqlValue::Map(entries)) => Ok(FieldValue::Map(
                entries
                    .iter()
                    .map(|(k, v)| Ok((key.decode(k)?, val.decode(v)?)))
                    .collect::<Result<_, CoreError>>()?,
            )),
            _ => Err(CoreError::Transcoding {
                codec: "collection",
                value: format!("{value:?}"),
                reason: format!("does not match declared type {:?}", self.source),
            }),
        }
    }
}

pub fn encode_all(codec: &SimpleCodec, items: &[FieldValue]) -> Result<Vec<CqlValue>, CoreError> {
    items.iter().map(|v| codec.encode(v)).collect()
}

pub fn encode_entries(
    key: &SimpleCodec,
    value: &SimpleCodec,
    entries: &[(FieldValue, FieldValue)],
) -> Result<Vec<(CqlValue, CqlValue)>, CoreError> {
    entries
        .iter()
        .map(|(k, v)| Ok((key.encode(k)?, value.encode(v)?)))
        .collect()
}

/// Selects codecs for declared field types.
#[derive(Debug, Clone)]
pub struct CodecFactory {
    mapper: Arc<dyn ObjectMapper>,
}

impl Default for CodecFactory {
    fn default() -> Self {
        Self::new(Arc::new(JsonObjectMapper))
    }
}

impl CodecFactory {
    pub fn new(mapper: Arc<dyn ObjectMapper>) -> Self {
        Self { mapper }
    }

    /// Pick the codec for `field_type`. `owner` only labels schema errors.
    pub fn codec_for(
        &self,
        owner: &str,
        field_type: &FieldType,
        hints: CodecHints,
    ) -> Result<Codec, CoreError> {
        trace!(owner, ?field_type, "selecting codec");
        let shape = match field_type {
            FieldType::List(element) => {
                Shape::List(self.element_codec(owner, element, hints.enum_encoding, hints)?)
            }
            FieldType::Set(element) => {
                Shape::Set(self.element_codec(owner, element, hints.enum_encoding, hints)?)
            }
            FieldType::Map(key, value) => Shape::Map {
                key: self.element_codec(owner, key, hints.key_enum_encoding, hints)?,
                value: self.element_codec(owner, value, hints.enum_encoding, hints)?,
            },
            simple => Shape::Simple(self.simple_codec(owner, simple, hints.enum_encoding, hints)?),
        };
        Ok(Codec {
            source: field_type.clone(),
            shape,
        })
    }

    fn element_codec(
        &self,
        owner: &str,
        element: &FieldType,
        encoding: Option<EnumEncoding>,
        hints: CodecHints,
    ) -> Result<SimpleCodec, CoreError> {
        match element {
            FieldType::List(_) | FieldType::Set(_) | FieldType::Map(..) => Err(CoreError::schema(
                owner,
                "nested collections are not supported",
            )),
            FieldType::Counter => Err(CoreError::schema(
                owner,
                "counters cannot be collection elements",
            )),
            _ => self.simple_codec(owner, element, encoding, hints),
        }
    }

    fn simple_codec(
        &self,
        owner: &str,
        field_type: &FieldType,
        encoding: Option<EnumEncoding>,
        hints: CodecHints,
    ) -> Result<SimpleCodec, CoreError> {
        let codec = match field_type {
            FieldType::Byte => SimpleCodec::Byte,
            FieldType::Bytes => SimpleCodec::ByteArray,
            FieldType::Boolean => SimpleCodec::Native(CqlType::Boolean),
            FieldType::Int => SimpleCodec::Native(CqlType::Int),
            FieldType::BigInt => SimpleCodec::Native(CqlType::BigInt),
            FieldType::Double => SimpleCodec::Native(CqlType::Double),
            FieldType::Text => SimpleCodec::Native(CqlType::Text),
            FieldType::Timestamp => SimpleCodec::Native(CqlType::Timestamp),
            FieldType::Uuid if hints.time_uuid => SimpleCodec::Native(CqlType::TimeUuid),
            FieldType::Uuid => SimpleCodec::Native(CqlType::Uuid),
            FieldType::Counter => SimpleCodec::Counter,
            FieldType::Enum { name, variants } => {
                if variants.is_empty() {
                    return Err(CoreError::schema(
                        owner,
                        format!("enum {name} declares no constants"),
                    ));
                }
                match encoding {
                    Some(EnumEncoding::Ordinal) => SimpleCodec::EnumOrdinal(variants.clone()),
                    Some(EnumEncoding::Name) | None => SimpleCodec::EnumName(variants.clone()),
                }
            }
            FieldType::Object { type_name } => SimpleCodec::Json {
                type_name: type_name.clone(),
                mapper: Arc::clone(&self.mapper),
            },
            FieldType::List(_) | FieldType::Set(_) | FieldType::Map(..) => {
                return Err(CoreError::schema(owner, "collection where a value was expected"));
            }
        };
        Ok(codec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn codec(field_type: FieldType) -> Codec {
        CodecFactory::default()
            .codec_for("Test.field", &field_type, CodecHints::default())
            .unwrap()
    }

    fn codec_with(field_type: FieldType, hints: CodecHints) -> Codec {
        CodecFactory::default()
            .codec_for("Test.field", &field_type, hints)
            .unwrap()
    }

    #[test]
    fn selection_follows_precedence() {
        assert!(matches!(codec(FieldType::Byte).element_codec(), SimpleCodec::Byte));
        assert!(matches!(codec(FieldType::Bytes).element_codec(), SimpleCodec::ByteArray));
        assert!(matches!(
            codec(FieldType::Text).element_codec(),
            SimpleCodec::Native(CqlType::Text)
        ));
        let status = FieldType::enumeration("Status", &["ACTIVE", "RETIRED"]);
        assert!(matches!(codec(status.clone()).element_codec(), SimpleCodec::EnumName(_)));
        let ordinal = CodecHints {
            enum_encoding: Some(EnumEncoding::Ordinal),
            ..CodecHints::default()
        };
        assert!(matches!(
            codec_with(status, ordinal).element_codec(),
            SimpleCodec::EnumOrdinal(_)
        ));
        assert!(matches!(
            codec(FieldType::object("Address")).element_codec(),
            SimpleCodec::Json { .. }
        ));
    }

    #[test]
    fn target_types() {
        assert_eq!(codec(FieldType::Counter).target_type(), CqlType::BigInt);
        let time = CodecHints {
            time_uuid: true,
            ..CodecHints::default()
        };
        assert_eq!(codec_with(FieldType::Uuid, time).target_type(), CqlType::TimeUuid);
        assert_eq!(
            codec(FieldType::map(FieldType::Text, FieldType::Byte)).target_type(),
            CqlType::Map(Box::new(CqlType::Text), Box::new(CqlType::Blob))
        );
    }

    #[test]
    fn nested_collections_are_schema_errors() {
        let err = CodecFactory::default()
            .codec_for(
                "Test.field",
                &FieldType::list(FieldType::set(FieldType::Int)),
                CodecHints::default(),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Schema { .. }));
    }

    #[test]
    fn map_codec_uses_separate_key_and_value_encodings() {
        let status = FieldType::enumeration("Status", &["ACTIVE", "RETIRED"]);
        let hints = CodecHints {
            key_enum_encoding: Some(EnumEncoding::Name),
            enum_encoding: Some(EnumEncoding::Ordinal),
            time_uuid: false,
        };
        let c = codec_with(FieldType::map(status.clone(), status), hints);
        let encoded = c
            .encode(&FieldValue::map_of([(
                FieldValue::Enum("RETIRED".into()),
                FieldValue::Enum("ACTIVE".into()),
            )]))
            .unwrap();
        assert_eq!(
            encoded,
            CqlValue::Map(vec![(CqlValue::Text("RETIRED".into()), CqlValue::Int(0))])
        );
    }

    #[test]
    fn unknown_enum_constant_is_rejected() {
        let c = codec(FieldType::enumeration("Status", &["ACTIVE"]));
        assert!(c.encode(&FieldValue::Enum("GONE".into())).is_err());
        assert!(c.decode(&CqlValue::Text("GONE".into())).is_err());
    }

    #[test]
    fn mismatched_value_is_a_transcoding_error() {
        let err = codec(FieldType::Int).encode(&FieldValue::text("x")).unwrap_err();
        assert!(matches!(err, CoreError::Transcoding { codec: "native", .. }));
    }

    #[test]
    fn empty_collections_roundtrip() {
        for (ty, value) in [
            (FieldType::list(FieldType::Text), FieldValue::List(vec![])),
            (FieldType::set(FieldType::Int), FieldValue::Set(vec![])),
            (FieldType::map(FieldType::Text, FieldType::Int), FieldValue::Map(vec![])),
        ] {
            let c = codec(ty);
            assert_eq!(c.decode(&c.encode(&value).unwrap()).unwrap(), value);
        }
    }

    fn arb_scalar() -> impl Strategy<Value = (FieldType, FieldValue)> {
        prop_oneof![
            any::<bool>().prop_map(|b| (FieldType::Boolean, FieldValue::Boolean(b))),
            any::<i8>().prop_map(|b| (FieldType::Byte, FieldValue::Byte(b))),
            prop::collection::vec(any::<u8>(), 0..16)
                .prop_map(|b| (FieldType::Bytes, FieldValue::Bytes(b))),
            any::<i32>().prop_map(|n| (FieldType::Int, FieldValue::Int(n))),
            any::<i64>().prop_map(|n| (FieldType::BigInt, FieldValue::BigInt(n))),
            any::<f64>().prop_map(|d| (FieldType::Double, FieldValue::Double(d))),
            "[a-zA-Z0-9 ]{0,12}".prop_map(|s| (FieldType::Text, FieldValue::Text(s))),
            any::<u128>().prop_map(|u| (FieldType::Uuid, FieldValue::Uuid(Uuid::from_u128(u)))),
            any::<i64>().prop_map(|ms| (FieldType::Timestamp, FieldValue::Timestamp(ms))),
            any::<i64>().prop_map(|n| (FieldType::Counter, FieldValue::Counter(n))),
            prop::sample::select(vec!["RED", "GREEN", "BLUE"]).prop_map(|v| (
                FieldType::enumeration("Color", &["RED", "GREEN", "BLUE"]),
                FieldValue::Enum(v.to_string())
            )),
            ("[a-z]{1,6}", any::<i32>()).prop_map(|(k, n)| (
                FieldType::object("Payload"),
                FieldValue::Object(serde_json::json!({ "name": k, "size": n }))
            )),
        ]
    }

    proptest! {
        #[test]
        fn prop_scalar_roundtrip((ty, value) in arb_scalar(), ordinal in any::<bool>()) {
            let hints = CodecHints {
                enum_encoding: ordinal.then_some(EnumEncoding::Ordinal),
                ..CodecHints::default()
            };
            let c = codec_with(ty, hints);
            let encoded = c.encode(&value).unwrap();
            prop_assert!(encoded.conforms_to(&c.target_type()));
            prop_assert_eq!(c.decode(&encoded).unwrap(), value);
        }

        #[test]
        fn prop_list_roundtrip(items in prop::collection::vec(any::<i64>(), 0..8)) {
            let c = codec(FieldType::list(FieldType::BigInt));
            let value = FieldValue::List(items.into_iter().map(FieldValue::BigInt).collect());
            prop_assert_eq!(c.decode(&c.encode(&value).unwrap()).unwrap(), value);
        }

        #[test]
        fn prop_set_roundtrip(items in prop::collection::vec("[a-z]{1,4}", 0..8)) {
            let c = codec(FieldType::set(FieldType::Text));
            let value = FieldValue::set_of(items.into_iter().map(FieldValue::Text));
            prop_assert_eq!(c.decode(&c.encode(&value).unwrap()).unwrap(), value);
        }

        #[test]
        fn prop_map_roundtrip(entries in prop::collection::btree_map("[a-z]{1,4}", any::<i8>(), 0..8)) {
            let c = codec(FieldType::map(FieldType::Text, FieldType::Byte));
            let value = FieldValue::map_of(
                entries.into_iter().map(|(k, v)| (FieldValue::Text(k), FieldValue::Byte(v))),
            );
            prop_assert_eq!(c.decode(&c.encode(&value).unwrap()).unwrap(), value);
        }
    }
}
