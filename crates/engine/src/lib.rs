//! Turns entity mutations into CQL writes and flushes them, one by one or
//! as batch envelopes.

pub mod batch;
pub mod cas;
pub mod error;
pub mod executor;
pub mod flush;
pub mod generator;
pub mod log;
pub mod manager;
pub mod statement;

pub use batch::{Batch, BatchBuilder};
pub use error::EngineError;
pub use executor::{Executor, Inline, Task, ThreadPerTask, WriteFuture};
pub use flush::{EventHolder, FlushContext, FlushMode};
pub use generator::{primary_key_from, primary_key_of, StatementGenerator};
pub use manager::EntityManager;
pub use statement::{GeneratedStatement, PendingStatement};
