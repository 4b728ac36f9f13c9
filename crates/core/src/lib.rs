pub mod cas;
pub mod clock;
pub mod codec;
pub mod config;
pub mod consistency;
pub mod cql;
pub mod dirty;
pub mod entity;
pub mod error;
pub mod field_value;
pub mod interceptor;
pub mod options;
pub mod schema;

pub use cas::{CasCondition, CasOp, CasOperation, CasOutcome, CasResult, CasResultListener};
pub use clock::MicrosClock;
pub use codec::{Codec, CodecFactory, CodecHints, EnumEncoding, FieldType, ObjectMapper};
pub use config::{Config, InsertStrategy};
pub use consistency::{ConsistencyLevel, ConsistencyResolver};
pub use cql::{CqlType, CqlValue};
pub use dirty::{ChangeKind, ChangeSource, DirtyChange, DirtyChangeSet};
pub use entity::{Entity, EntityHandle, Record};
pub use error::CoreError;
pub use field_value::FieldValue;
pub use interceptor::{Event, Interceptor};
pub use options::WriteOptions;
pub use schema::{ClusteringOrder, EntityMeta, EntityRegistry, PropertyDecl, PropertyMeta, PropertyRole};
