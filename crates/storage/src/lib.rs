pub mod error;
pub mod journal;
pub mod memory;
pub mod result;
pub mod schema;
pub mod store;

pub use error::StorageError;
pub use journal::{JournalEntry, JournalStore};
pub use memory::{Executed, MemoryStore};
pub use result::{ColumnDefinition, ExecutionInfo, QueryTrace, ResultSet, Row, TraceEvent, APPLIED_COLUMN};
pub use store::{BatchEnvelope, BatchType, Statement, Store};
