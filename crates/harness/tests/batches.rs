use quill_core::{ConsistencyLevel, CqlValue, Event, FieldValue, WriteOptions};
use quill_engine::{EngineError, FlushMode};
use quill_harness::{loaded_user, new_tweet, new_user, page_view, TestSession, PAGE_VIEW, USER};
use quill_storage::{BatchType, StorageError};

fn timestamp_of(values: &[CqlValue]) -> i64 {
    match values.last() {
        Some(CqlValue::BigInt(ts)) => *ts,
        other => panic!("expected a trailing timestamp, got {other:?}"),
    }
}

// ============================================================================
// Envelopes
// ============================================================================

#[test]
fn counters_travel_in_their_own_envelope() -> Result<(), Box<dyn std::error::Error>> {
    let session = TestSession::new()?;
    let mut batch = session.manager.batch().consistency(ConsistencyLevel::Quorum).start();

    batch.insert(new_user(1, "Ann", "ann@example.com"), WriteOptions::new())?;
    let home = page_view("/home", "2024-05-01");
    {
        let mut home = home.lock().unwrap();
        home.increment("views", 1);
        home.increment("clicks", 1);
    }
    batch.update(home, WriteOptions::new())?;
    assert_eq!(batch.pending(), 3);
    assert!(session.store.executed()?.is_empty());

    assert!(batch.end_batch()?.is_applied());
    let batches = session.store.batches()?;
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].batch_type, BatchType::Logged);
    assert_eq!(batches[0].len(), 1);
    assert_eq!(batches[1].batch_type, BatchType::Counter);
    assert_eq!(batches[1].len(), 2);
    for envelope in &batches {
        assert_eq!(envelope.consistency, ConsistencyLevel::Quorum);
    }
    Ok(())
}

#[test]
fn envelope_falls_back_to_first_statement_consistency() -> Result<(), Box<dyn std::error::Error>> {
    let session = TestSession::new()?;
    let mut batch = session.manager.batch().unlogged().start();
    batch.insert(new_tweet(7, "first"), WriteOptions::new())?;
    batch.insert(new_user(1, "Ann", "ann@example.com"), WriteOptions::new())?;
    batch.flush()?;

    let batches = session.store.batches()?;
    assert_eq!(batches[0].batch_type, BatchType::Unlogged);
    assert_eq!(batches[0].consistency, ConsistencyLevel::LocalQuorum);
    Ok(())
}

#[test]
fn batched_counter_delete_goes_to_counter_envelope() -> Result<(), Box<dyn std::error::Error>> {
    let session = TestSession::new()?;
    let mut batch = session.manager.batch().start();
    batch.remove_by_id(
        PAGE_VIEW,
        &[FieldValue::text("/home"), FieldValue::text("2024-05-01")],
        WriteOptions::new(),
    )?;
    batch.remove(loaded_user(2, "Bob"), WriteOptions::new())?;
    batch.flush()?;

    let batches = session.store.batches()?;
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].statements[0].query, "DELETE FROM users WHERE id = ?");
    let counter_queries: Vec<&str> = batches[1].statements.iter().map(|s| s.query.as_str()).collect();
    assert_eq!(
        counter_queries,
        [
            "DELETE FROM page_views WHERE page = ? AND day = ?",
            "DELETE FROM users_counters WHERE id = ?",
        ]
    );
    Ok(())
}

#[test]
fn native_statements_join_the_envelope() -> Result<(), Box<dyn std::error::Error>> {
    let session = TestSession::new()?;
    let mut batch = session.manager.batch().start();
    batch.insert(new_user(1, "Ann", "ann@example.com"), WriteOptions::new())?;
    batch.batch_native_statement(
        "DELETE FROM sessions WHERE user_id = ?",
        vec![CqlValue::Int(1)],
    )?;
    let err = batch
        .batch_native_statement("TRUNCATE sessions", Vec::new())
        .unwrap_err();
    assert!(matches!(err, EngineError::Usage(_)));
    batch.flush()?;

    let batches = session.store.batches()?;
    assert_eq!(batches[0].len(), 2);
    assert_eq!(batches[0].statements[1].query, "DELETE FROM sessions WHERE user_id = ?");
    Ok(())
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn ordered_batch_timestamps_strictly_increase() -> Result<(), Box<dyn std::error::Error>> {
    let session = TestSession::new()?;
    let mut batch = session.manager.batch().ordered().start();
    assert_eq!(batch.context().mode(), FlushMode::OrderedBatch);

    for id in 0..20 {
        batch.insert(new_user(id, "u", "u@example.com"), WriteOptions::new())?;
    }
    let ann = loaded_user(100, "Ann");
    ann.lock().unwrap().set("name", FieldValue::text("Annie"));
    batch.update(ann, WriteOptions::new())?;
    batch.remove(loaded_user(101, "Bob"), WriteOptions::new())?;
    batch.flush()?;

    let batches = session.store.batches()?;
    let envelope = &batches[0];
    assert_eq!(envelope.len(), 22);
    let stamps: Vec<i64> = envelope
        .statements
        .iter()
        .map(|s| {
            assert!(s.query.contains("TIMESTAMP ?"), "unstamped: {}", s.query);
            // INSERT binds USING values last; UPDATE and DELETE bind them first.
            if s.query.starts_with("INSERT") {
                timestamp_of(&s.values)
            } else {
                match &s.values[0] {
                    CqlValue::BigInt(ts) => *ts,
                    other => panic!("expected a timestamp, got {other:?}"),
                }
            }
        })
        .collect();
    assert!(stamps.windows(2).all(|w| w[0] < w[1]), "{stamps:?}");
    Ok(())
}

#[test]
fn unordered_batch_leaves_timestamps_to_the_server() -> Result<(), Box<dyn std::error::Error>> {
    let session = TestSession::new()?;
    let mut batch = session.manager.batch().start();
    for id in 0..3 {
        batch.insert(new_user(id, "u", "u@example.com"), WriteOptions::new())?;
    }
    batch.flush()?;

    for statement in &session.store.batches()?[0].statements {
        assert!(!statement.query.contains("TIMESTAMP"));
    }
    Ok(())
}

#[test]
fn ordered_batch_leaves_counter_entities_unstamped() -> Result<(), Box<dyn std::error::Error>> {
    let session = TestSession::new()?;
    let mut batch = session.manager.batch().ordered().start();
    let home = page_view("/home", "2024-05-01");
    home.lock().unwrap().increment("views", 1);
    batch.update(home, WriteOptions::new())?;
    batch.flush()?;

    let batches = session.store.batches()?;
    let envelope = &batches[0];
    assert_eq!(envelope.batch_type, BatchType::Counter);
    assert!(!envelope.statements[0].query.contains("USING"));
    Ok(())
}

// ============================================================================
// Session control
// ============================================================================

#[test]
fn post_events_wait_for_flush() -> Result<(), Box<dyn std::error::Error>> {
    let session = TestSession::new()?;
    let mut batch = session.manager.batch().start();
    batch.insert(new_user(1, "Ann", "ann@example.com"), WriteOptions::new())?;
    assert_eq!(session.events.events_for(USER), vec![Event::PrePersist]);
    assert_eq!(batch.context().pending_events(), 1);

    batch.flush()?;
    assert_eq!(
        session.events.events_for(USER),
        vec![Event::PrePersist, Event::PostPersist]
    );
    Ok(())
}

#[test]
fn per_operation_consistency_must_match_the_batch() -> Result<(), Box<dyn std::error::Error>> {
    let session = TestSession::new()?;
    let mut batch = session.manager.batch().consistency(ConsistencyLevel::LocalQuorum).start();
    batch.insert(new_user(1, "Ann", "ann@example.com"), WriteOptions::new())?;

    let mismatched = WriteOptions::new().with_consistency(ConsistencyLevel::One);
    let err = batch
        .insert(new_user(2, "Bob", "bob@example.com"), mismatched)
        .unwrap_err();
    assert!(matches!(err, EngineError::Usage(_)));
    assert_eq!(batch.pending(), 0);

    let matching = WriteOptions::new().with_consistency(ConsistencyLevel::LocalQuorum);
    batch.insert(new_user(3, "Cy", "cy@example.com"), matching)?;
    assert_eq!(batch.pending(), 1);
    Ok(())
}

#[test]
fn start_batch_discards_pending_work() -> Result<(), Box<dyn std::error::Error>> {
    let session = TestSession::new()?;
    let mut batch = session.manager.batch().start();
    batch.insert(new_user(1, "Ann", "ann@example.com"), WriteOptions::new())?;
    batch.start_batch(Some(ConsistencyLevel::All), None);
    assert_eq!(batch.pending(), 0);

    batch.insert(new_user(2, "Bob", "bob@example.com"), WriteOptions::new())?;
    batch.flush()?;
    let batches = session.store.batches()?;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].consistency, ConsistencyLevel::All);
    assert_eq!(batches[0].statements[0].values[0], CqlValue::Int(2));
    Ok(())
}

#[test]
fn failed_flush_discards_pending_work() -> Result<(), Box<dyn std::error::Error>> {
    let session = TestSession::new()?;
    session
        .store
        .fail_next(StorageError::WriteFailure("coordinator lost".into()))?;
    let mut batch = session.manager.batch().start();
    batch.insert(new_user(1, "Ann", "ann@example.com"), WriteOptions::new())?;

    let err = batch.flush().unwrap_err();
    assert!(matches!(err, EngineError::Storage(StorageError::WriteFailure(_))));
    assert_eq!(batch.pending(), 0);
    assert_eq!(session.events.events_for(USER), vec![Event::PrePersist]);

    // The batch stays usable.
    batch.insert(new_user(2, "Bob", "bob@example.com"), WriteOptions::new())?;
    assert!(batch.flush()?.is_applied());
    Ok(())
}
