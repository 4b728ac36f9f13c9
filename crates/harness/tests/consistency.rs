use std::sync::{Arc, Mutex};

use quill_core::{Config, ConsistencyLevel, FieldValue, Record, WriteOptions};
use quill_harness::{loaded_user, new_tweet, page_view, TestSession};

fn config() -> Config {
    let mut config = Config {
        default_write_consistency: ConsistencyLevel::LocalOne,
        ..Config::default()
    };
    config
        .write_consistency_map
        .insert("users".into(), ConsistencyLevel::Quorum);
    config
        .write_consistency_map
        .insert("tweets".into(), ConsistencyLevel::EachQuorum);
    config
}

fn renamed(id: i32) -> Arc<Mutex<Record>> {
    let user = loaded_user(id, "Ann");
    user.lock().unwrap().set("name", FieldValue::text("Annie"));
    user
}

#[test]
fn call_level_beats_table_level() -> Result<(), Box<dyn std::error::Error>> {
    let session = TestSession::with_config(config())?;
    session
        .manager
        .update(renamed(1), WriteOptions::new().with_consistency(ConsistencyLevel::All))?;
    session.manager.update(renamed(2), WriteOptions::new())?;

    let statements = session.statements()?;
    assert_eq!(statements[0].consistency, Some(ConsistencyLevel::All));
    assert_eq!(statements[1].consistency, Some(ConsistencyLevel::Quorum));
    Ok(())
}

#[test]
fn configured_table_level_beats_entity_declaration() -> Result<(), Box<dyn std::error::Error>> {
    let session = TestSession::with_config(config())?;
    session.manager.insert(new_tweet(1, "hi"), WriteOptions::new())?;
    assert_eq!(session.statements()?[0].consistency, Some(ConsistencyLevel::EachQuorum));

    let declared = TestSession::new()?;
    declared.manager.insert(new_tweet(1, "hi"), WriteOptions::new())?;
    assert_eq!(declared.statements()?[0].consistency, Some(ConsistencyLevel::LocalQuorum));
    Ok(())
}

#[test]
fn unmapped_tables_use_the_default() -> Result<(), Box<dyn std::error::Error>> {
    let session = TestSession::with_config(config())?;
    let home = page_view("/home", "2024-05-01");
    home.lock().unwrap().increment("views", 1);
    session.manager.update(home, WriteOptions::new())?;
    assert_eq!(session.statements()?[0].consistency, Some(ConsistencyLevel::LocalOne));
    Ok(())
}

#[test]
fn resolver_agrees_with_executed_levels() -> Result<(), Box<dyn std::error::Error>> {
    let session = TestSession::with_config(config())?;
    let resolver = session.manager.resolver();
    for (table, call) in [
        ("users", None),
        ("users", Some(ConsistencyLevel::Two)),
        ("tweets", None),
        ("page_views", None),
    ] {
        let expected = match (table, call) {
            (_, Some(level)) => level,
            ("users", None) => ConsistencyLevel::Quorum,
            ("tweets", None) => ConsistencyLevel::EachQuorum,
            _ => ConsistencyLevel::LocalOne,
        };
        assert_eq!(resolver.write(table, call), expected, "{table}");
    }
    Ok(())
}
