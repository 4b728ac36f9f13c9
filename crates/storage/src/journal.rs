use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::{debug, warn};
use uuid::Uuid;

use quill_core::{ConsistencyLevel, CqlValue};

use crate::error::StorageError;
use crate::result::ResultSet;
use crate::store::{BatchEnvelope, BatchType, Statement, Store};

/// One journaled submission. Single statements have no batch type.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    pub envelope_id: Uuid,
    pub batch_type: Option<BatchType>,
    pub consistency: Option<ConsistencyLevel>,
    pub serial_consistency: Option<ConsistencyLevel>,
    pub checksum: [u8; 32],
    pub statements: Vec<Statement>,
}

/// Forwards to an inner store and durably records every successful
/// submission in SQLite, for audit and replay.
///
/// The inner store's answer is always returned as is. A submission that
/// executed but could not be journaled is logged and counted in
/// [`JournalStore::missed`], never reported as a failed write.
pub struct JournalStore<S> {
    inner: S,
    conn: Mutex<Connection>,
    missed: AtomicU64,
}

impl<S: Store> JournalStore<S> {
    pub fn open(path: impl AsRef<Path>, inner: S) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self {
            inner,
            conn: Mutex::new(conn),
            missed: AtomicU64::new(0),
        })
    }

    pub fn open_in_memory(inner: S) -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self {
            inner,
            conn: Mutex::new(conn),
            missed: AtomicU64::new(0),
        })
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Submissions that executed but are absent from the journal.
    pub fn missed(&self) -> u64 {
        self.missed.load(Ordering::Relaxed)
    }

    pub fn envelope_count(&self) -> Result<u64, StorageError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM envelopes", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Every journaled submission in execution order, checksums verified.
    pub fn read_envelopes(&self) -> Result<Vec<JournalEntry>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT envelope_id, batch_type, consistency, serial_consistency, checksum
             FROM envelopes ORDER BY rowid",
        )?;
        let heads = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, Vec<u8>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Vec<u8>>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut entries = Vec::with_capacity(heads.len());
        for (id_bytes, batch_type, consistency, serial, checksum_bytes) in heads {
            let envelope_id = Uuid::from_slice(&id_bytes)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            let checksum: [u8; 32] = checksum_bytes
                .try_into()
                .map_err(|_| StorageError::Serialization("invalid checksum length".into()))?;
            let statements = read_statements(&conn, &id_bytes)?;
            if checksum_of(&statements)? != checksum {
                return Err(StorageError::Serialization(format!(
                    "checksum mismatch for envelope {envelope_id}"
                )));
            }
            entries.push(JournalEntry {
                envelope_id,
                batch_type: batch_type.as_deref().map(BatchType::parse).transpose()?,
                consistency: consistency.as_deref().map(ConsistencyLevel::parse).transpose()?,
                serial_consistency: serial.as_deref().map(ConsistencyLevel::parse).transpose()?,
                checksum,
                statements,
            });
        }
        Ok(entries)
    }

    fn append(
        &self,
        batch_type: Option<BatchType>,
        consistency: Option<ConsistencyLevel>,
        serial_consistency: Option<ConsistencyLevel>,
        statements: &[Statement],
    ) -> Result<(), StorageError> {
        let envelope_id = Uuid::now_v7();
        let checksum = checksum_of(statements)?;
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO envelopes (envelope_id, batch_type, consistency, serial_consistency, statement_count, checksum) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                envelope_id.as_bytes().as_slice(),
                batch_type.map(|b| b.as_str()),
                consistency.map(|c| c.as_str()),
                serial_consistency.map(|c| c.as_str()),
                statements.len() as i64,
                &checksum[..],
            ],
        )?;
        for (position, statement) in statements.iter().enumerate() {
            tx.execute(
                "INSERT INTO journal_statements (envelope_id, position, query, bound_values) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    envelope_id.as_bytes().as_slice(),
                    position as i64,
                    statement.query,
                    encode_values(&statement.values)?,
                ],
            )?;
        }
        tx.commit()?;

        debug!(%envelope_id, statements = statements.len(), "journaled envelope");
        Ok(())
    }

    fn record(
        &self,
        batch_type: Option<BatchType>,
        consistency: Option<ConsistencyLevel>,
        serial_consistency: Option<ConsistencyLevel>,
        statements: &[Statement],
    ) {
        if let Err(err) = self.append(batch_type, consistency, serial_consistency, statements) {
            let missed = self.missed.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(
                error = %err,
                statements = statements.len(),
                missed,
                "executed submission could not be journaled"
            );
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl<S: Store> Store for JournalStore<S> {
    fn execute(&self, statement: &Statement) -> Result<ResultSet, StorageError> {
        let result = self.inner.execute(statement)?;
        self.record(
            None,
            statement.consistency,
            statement.serial_consistency,
            std::slice::from_ref(statement),
        );
        Ok(result)
    }

    fn execute_batch(&self, batch: &BatchEnvelope) -> Result<ResultSet, StorageError> {
        let result = self.inner.execute_batch(batch)?;
        self.record(
            Some(batch.batch_type),
            Some(batch.consistency),
            batch.serial_consistency,
            &batch.statements,
        );
        Ok(result)
    }
}

impl<S> std::fmt::Debug for JournalStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalStore")
            .field("missed", &self.missed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

fn encode_values(values: &[CqlValue]) -> Result<Vec<u8>, StorageError> {
    rmp_serde::to_vec(values).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn checksum_of(statements: &[Statement]) -> Result<[u8; 32], StorageError> {
    let mut hasher = blake3::Hasher::new();
    for statement in statements {
        hasher.update(statement.query.as_bytes());
        hasher.update(&encode_values(&statement.values)?);
    }
    Ok(*hasher.finalize().as_bytes())
}

fn read_statements(conn: &Connection, envelope_id: &[u8]) -> Result<Vec<Statement>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT query, bound_values FROM journal_statements WHERE envelope_id = ?1 ORDER BY position",
    )?;
    let rows = stmt
        .query_map([envelope_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(query, bytes)| {
            let values: Vec<CqlValue> = rmp_serde::from_slice(&bytes)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            Ok(Statement::new(query, values))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn update(id: i32) -> Statement {
        Statement::new(
            "UPDATE users SET name = ? WHERE id = ?",
            vec![CqlValue::Text(format!("user-{id}")), CqlValue::Int(id)],
        )
        .with_consistency(ConsistencyLevel::Quorum)
    }

    #[test]
    fn journals_singles_and_batches() {
        let journal = JournalStore::open_in_memory(MemoryStore::new()).unwrap();
        journal.execute(&update(1)).unwrap();

        let mut batch = BatchEnvelope::new(BatchType::Counter, ConsistencyLevel::One);
        batch.statements.push(Statement::new(
            "UPDATE views SET hits = hits + ? WHERE page = ?",
            vec![CqlValue::Counter(3), CqlValue::Text("home".into())],
        ));
        journal.execute_batch(&batch).unwrap();

        assert_eq!(journal.envelope_count().unwrap(), 2);
        let entries = journal.read_envelopes().unwrap();
        assert_eq!(entries[0].batch_type, None);
        assert_eq!(entries[0].consistency, Some(ConsistencyLevel::Quorum));
        assert_eq!(entries[0].statements[0].values, update(1).values);
        assert_eq!(entries[1].batch_type, Some(BatchType::Counter));
        assert_eq!(entries[1].statements[0].values[0], CqlValue::Counter(3));
        assert_eq!(journal.inner().executed().unwrap().len(), 2);
    }

    #[test]
    fn failed_submissions_are_not_journaled() {
        let journal = JournalStore::open_in_memory(MemoryStore::new()).unwrap();
        journal
            .inner()
            .fail_next(StorageError::WriteFailure("timeout".into()))
            .unwrap();
        assert!(journal.execute(&update(1)).is_err());
        assert_eq!(journal.envelope_count().unwrap(), 0);
    }

    #[test]
    fn journal_failure_does_not_fail_an_executed_write() {
        let journal = JournalStore::open_in_memory(MemoryStore::new()).unwrap();
        journal
            .conn()
            .unwrap()
            .execute("DROP TABLE journal_statements", [])
            .unwrap();

        let increment = Statement::new(
            "UPDATE views SET hits = hits + ? WHERE page = ?",
            vec![CqlValue::Counter(1), CqlValue::Text("home".into())],
        );
        assert!(journal.execute(&increment).unwrap().first_row().is_none());
        assert_eq!(journal.inner().executed().unwrap().len(), 1);
        assert_eq!(journal.missed(), 1);
        assert_eq!(journal.envelope_count().unwrap(), 0);
    }

    #[test]
    fn journal_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.db");
        {
            let journal = JournalStore::open(&path, MemoryStore::new()).unwrap();
            journal.execute(&update(1)).unwrap();
            journal.execute(&update(2)).unwrap();
        }
        let journal = JournalStore::open(&path, MemoryStore::new()).unwrap();
        let entries = journal.read_envelopes().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].statements[0].values[1], CqlValue::Int(2));
    }

    #[test]
    fn tampered_payload_fails_checksum() {
        let journal = JournalStore::open_in_memory(MemoryStore::new()).unwrap();
        journal.execute(&update(1)).unwrap();
        journal
            .conn()
            .unwrap()
            .execute("UPDATE journal_statements SET query = 'DELETE FROM users'", [])
            .unwrap();
        assert!(matches!(
            journal.read_envelopes(),
            Err(StorageError::Serialization(_))
        ));
    }
}
