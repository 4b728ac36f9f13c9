use std::sync::Arc;

use quill_core::{Event, FieldValue, WriteOptions};
use quill_engine::{EngineError, ThreadPerTask};
use quill_harness::{loaded_user, new_user, TestSession, USER};

#[test]
fn async_writes_complete_on_worker_threads() -> Result<(), Box<dyn std::error::Error>> {
    let session = TestSession::new()?;
    let manager = session.manager.clone().with_executor(Arc::new(ThreadPerTask));

    let futures = (0..8)
        .map(|id| manager.insert_async(new_user(id, "u", "u@example.com"), WriteOptions::new()))
        .collect::<Result<Vec<_>, _>>()?;
    for future in futures {
        assert!(future.wait()?.is_applied());
    }

    assert_eq!(session.statements()?.len(), 8);
    let events = session.events.events_for(USER);
    assert_eq!(events.iter().filter(|e| **e == Event::PostPersist).count(), 8);
    Ok(())
}

#[test]
fn usage_errors_surface_before_submission() -> Result<(), Box<dyn std::error::Error>> {
    let session = TestSession::new()?;
    let ann = loaded_user(1, "Ann");
    ann.lock().unwrap().set("id", FieldValue::Int(2));

    let err = session
        .manager
        .update_async(ann, WriteOptions::new())
        .map(|_| ())
        .unwrap_err();
    assert!(matches!(err, EngineError::Usage(_)));
    assert!(session.statements()?.is_empty());
    Ok(())
}

#[test]
fn async_batch_flush_leaves_the_session_open() -> Result<(), Box<dyn std::error::Error>> {
    let session = TestSession::new()?;
    let manager = session.manager.clone().with_executor(Arc::new(ThreadPerTask));
    let mut batch = manager.batch().start();

    batch.insert(new_user(1, "Ann", "ann@example.com"), WriteOptions::new())?;
    let first = batch.flush_async();
    batch.insert(new_user(2, "Bob", "bob@example.com"), WriteOptions::new())?;
    assert_eq!(batch.pending(), 1);

    assert!(first.wait()?.is_applied());
    assert!(batch.end_batch()?.is_applied());
    assert_eq!(session.store.batches()?.len(), 2);
    Ok(())
}
