use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use quill_core::{Config, CqlType, CqlValue};
use quill_engine::{EntityManager, Inline};
use quill_storage::{JournalStore, MemoryStore, ResultSet, Row, Statement, StorageError};
use tempfile::TempDir;

use crate::fixtures::{self, EventLog};

/// An entity manager over an in-memory store, executing inline.
pub struct TestSession {
    pub store: Arc<MemoryStore>,
    pub manager: EntityManager,
    pub events: Arc<EventLog>,
}

impl TestSession {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Result<Self, Box<dyn Error>> {
        crate::init_tracing();
        let store = Arc::new(MemoryStore::new());
        let events = Arc::new(EventLog::default());
        let registry = fixtures::registry(&events)?;
        let manager = EntityManager::new(store.clone(), registry, config).with_executor(Arc::new(Inline));
        Ok(Self { store, manager, events })
    }

    /// Every statement sent so far, batched ones included.
    pub fn statements(&self) -> Result<Vec<Statement>, StorageError> {
        self.store.statements()
    }

    pub fn queries(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.statements()?.into_iter().map(|s| s.query).collect())
    }

    /// Make the next submission answer like a rejected conditional write.
    pub fn reject_next(&self, current: &[(&str, CqlType, CqlValue)]) -> Result<(), StorageError> {
        let row = current
            .iter()
            .fold(Row::applied(false), |row, (name, cql_type, value)| {
                row.with_column(name, cql_type.clone(), value.clone())
            });
        self.store.push_response(ResultSet::single(row))
    }
}

/// Like [`TestSession`], with every successful submission journaled to a
/// SQLite file in a temporary directory.
pub struct JournaledSession {
    pub store: Arc<MemoryStore>,
    pub journal: Arc<JournalStore<Arc<MemoryStore>>>,
    pub manager: EntityManager,
    path: PathBuf,
    _dir: TempDir,
}

impl JournaledSession {
    pub fn open() -> Result<Self, Box<dyn Error>> {
        crate::init_tracing();
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("journal.db");
        let store = Arc::new(MemoryStore::new());
        let journal = Arc::new(JournalStore::open(&path, store.clone())?);
        let registry = fixtures::registry(&Arc::new(EventLog::default()))?;
        let manager = EntityManager::new(journal.clone(), registry, Config::default())
            .with_executor(Arc::new(Inline));
        Ok(Self {
            store,
            journal,
            manager,
            path,
            _dir: dir,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A second handle on the same journal file.
    pub fn reopen(&self) -> Result<JournalStore<Arc<MemoryStore>>, StorageError> {
        JournalStore::open(&self.path, Arc::new(MemoryStore::new()))
    }
}
