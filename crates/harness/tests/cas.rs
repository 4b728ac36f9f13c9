use std::sync::{Arc, Mutex};

use quill_core::{
    CasCondition, CasOp, CasOperation, CasOutcome, CasResult, CasResultListener, ConsistencyLevel,
    CoreError, CqlType, CqlValue, Event, FieldValue, WriteOptions,
};
use quill_engine::EngineError;
use quill_harness::{loaded_user, new_user, TestSession, USER};
use quill_storage::{BatchType, ResultSet, Row};

#[derive(Default)]
struct Outcomes {
    applied: Mutex<usize>,
    rejected: Mutex<Vec<CasResult>>,
}

impl CasResultListener for Outcomes {
    fn on_success(&self) {
        *self.applied.lock().unwrap() += 1;
    }

    fn on_error(&self, result: &CasResult) {
        self.rejected.lock().unwrap().push(result.clone());
    }
}

fn helen() -> [(&'static str, CqlType, CqlValue); 2] {
    [
        ("id", CqlType::Int, CqlValue::Int(1)),
        ("name", CqlType::Text, CqlValue::Text("Helen".into())),
    ]
}

// ============================================================================
// Rejections
// ============================================================================

#[test]
fn insert_if_not_exists_reports_existing_row() -> Result<(), Box<dyn std::error::Error>> {
    let session = TestSession::new()?;
    session.reject_next(&helen())?;
    let listener = Arc::new(Outcomes::default());

    let options = WriteOptions::new()
        .if_not_exists()
        .with_cas_listener(listener.clone());
    let outcome = session
        .manager
        .insert(new_user(1, "Ann", "ann@example.com"), options)?;

    let CasOutcome::Rejected(result) = outcome else {
        panic!("expected the insert to be rejected");
    };
    assert_eq!(result.operation, CasOperation::Insert);
    assert_eq!(result.current_values["name"], CqlValue::Text("Helen".into()));
    assert_eq!(result.current_values["id"], CqlValue::Int(1));
    assert_eq!(listener.rejected.lock().unwrap().as_slice(), [result]);
    assert_eq!(*listener.applied.lock().unwrap(), 0);

    // The write did not happen, so post-persist callbacks do not run.
    assert_eq!(session.events.events_for(USER), vec![Event::PrePersist]);
    assert!(session.statements()?[0].query.ends_with(" IF NOT EXISTS"));
    Ok(())
}

#[test]
fn conditional_update_reports_current_values() -> Result<(), Box<dyn std::error::Error>> {
    let session = TestSession::new()?;
    session.reject_next(&helen())?;
    let ann = loaded_user(1, "Ann");
    ann.lock().unwrap().set("name", FieldValue::text("Bob"));

    let options = WriteOptions::new().with_condition(CasCondition::eq("name", FieldValue::text("Ann")));
    let err = session
        .manager
        .update(ann, options)?
        .into_result()
        .map_err(EngineError::from)
        .unwrap_err();

    let EngineError::CasRejected(result) = err else {
        panic!("expected a CAS rejection");
    };
    assert_eq!(result.operation, CasOperation::Update);
    assert_eq!(result.current_values["name"], CqlValue::Text("Helen".into()));
    assert!(result.to_string().contains("Helen"));
    Ok(())
}

#[test]
fn rejected_row_with_mistyped_column_is_a_transcoding_error() -> Result<(), Box<dyn std::error::Error>> {
    let session = TestSession::new()?;
    session.reject_next(&[("name", CqlType::Text, CqlValue::Int(3))])?;

    let err = session
        .manager
        .insert(new_user(1, "Ann", "ann@example.com"), WriteOptions::new().if_not_exists())
        .unwrap_err();
    assert!(matches!(err, EngineError::Core(CoreError::Transcoding { .. })));
    Ok(())
}

// ============================================================================
// Successful conditional writes
// ============================================================================

#[test]
fn applied_condition_notifies_success() -> Result<(), Box<dyn std::error::Error>> {
    let session = TestSession::new()?;
    session.store.push_response(ResultSet::single(Row::applied(true)))?;
    let listener = Arc::new(Outcomes::default());
    let ann = loaded_user(1, "Ann");
    ann.lock().unwrap().set("name", FieldValue::text("Annie"));

    let options = WriteOptions::new()
        .with_condition(CasCondition::new("name", CasOp::NotEq, FieldValue::text("Zed")))
        .with_condition(CasCondition::eq("email", FieldValue::text("ann@example.com")))
        .with_cas_listener(listener.clone());
    assert!(session.manager.update(ann, options)?.is_applied());
    assert_eq!(*listener.applied.lock().unwrap(), 1);

    let statements = session.statements()?;
    let statement = &statements[0];
    assert_eq!(
        statement.query,
        "UPDATE users SET name = ? WHERE id = ? IF name != ? AND email = ?"
    );
    assert_eq!(
        statement.values,
        vec![
            CqlValue::Text("Annie".into()),
            CqlValue::Int(1),
            CqlValue::Text("Zed".into()),
            CqlValue::Text("ann@example.com".into()),
        ]
    );
    Ok(())
}

#[test]
fn serial_consistency_travels_with_the_statement() -> Result<(), Box<dyn std::error::Error>> {
    let session = TestSession::new()?;
    let options = WriteOptions::new()
        .if_not_exists()
        .with_serial_consistency(ConsistencyLevel::LocalSerial);
    session
        .manager
        .insert(new_user(1, "Ann", "ann@example.com"), options)?;

    let statements = session.statements()?;
    let statement = &statements[0];
    assert_eq!(statement.serial_consistency, Some(ConsistencyLevel::LocalSerial));
    Ok(())
}

// ============================================================================
// Misuse
// ============================================================================

#[test]
fn invalid_conditional_options_are_usage_errors() -> Result<(), Box<dyn std::error::Error>> {
    let session = TestSession::new()?;
    let condition = || CasCondition::eq("name", FieldValue::text("Ann"));

    let cases = [
        (
            "condition on insert",
            session
                .manager
                .insert(new_user(1, "Ann", "a@x"), WriteOptions::new().with_condition(condition())),
        ),
        (
            "non-serial serial level",
            session.manager.insert(
                new_user(1, "Ann", "a@x"),
                WriteOptions::new()
                    .if_not_exists()
                    .with_serial_consistency(ConsistencyLevel::Quorum),
            ),
        ),
        (
            "condition on remove",
            session
                .manager
                .remove(loaded_user(1, "Ann"), WriteOptions::new().with_condition(condition())),
        ),
        (
            "listener without condition",
            session.manager.update(
                loaded_user(1, "Ann"),
                WriteOptions::new().with_cas_listener(Arc::new(Outcomes::default())),
            ),
        ),
    ];
    for (case, result) in cases {
        assert!(matches!(result, Err(EngineError::Usage(_))), "{case}: {result:?}");
    }
    assert!(session.statements()?.is_empty());
    Ok(())
}

#[test]
fn rejected_batch_skips_counter_envelope() -> Result<(), Box<dyn std::error::Error>> {
    let session = TestSession::new()?;
    session.reject_next(&helen())?;
    let mut batch = session.manager.batch().start();

    let ann = loaded_user(1, "Ann");
    {
        let mut ann = ann.lock().unwrap();
        ann.set("name", FieldValue::text("Bob"));
        ann.increment("logins", 1);
    }
    batch.update(ann, WriteOptions::new().with_condition(CasCondition::eq("name", FieldValue::text("Ann"))))?;

    let outcome = batch.end_batch()?;
    assert!(!outcome.is_applied());
    let batches = session.store.batches()?;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].batch_type, BatchType::Logged);
    assert_eq!(session.events.events_for(USER), vec![Event::PreUpdate]);
    Ok(())
}
