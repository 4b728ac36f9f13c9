use std::sync::{Arc, Mutex};

use quill_core::{
    ClusteringOrder, ConsistencyLevel, CoreError, Entity, EntityMeta, EntityRegistry, Event,
    FieldType, FieldValue, Interceptor, PropertyDecl, Record,
};
use uuid::Uuid;

pub const USER: &str = "User";
pub const TWEET: &str = "Tweet";
pub const PAGE_VIEW: &str = "PageView";

/// Lifecycle events seen by the logging interceptors, in firing order.
#[derive(Debug, Default)]
pub struct EventLog {
    seen: Mutex<Vec<(String, Event)>>,
}

impl EventLog {
    pub fn events(&self) -> Vec<(String, Event)> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }

    pub fn events_for(&self, entity_name: &str) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|(name, _)| name == entity_name)
            .map(|(_, event)| event)
            .collect()
    }

    fn record(&self, entity_name: &str, event: Event) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push((entity_name.to_string(), event));
        }
    }
}

struct LogEvent {
    events: [Event; 1],
    log: Arc<EventLog>,
}

impl Interceptor for LogEvent {
    fn events(&self) -> &[Event] {
        &self.events
    }

    fn on_event(&self, entity: &mut dyn Entity) {
        self.log.record(entity.entity_name(), self.events[0]);
    }
}

/// Lowercases `email` before it is written.
struct NormalizeEmail;

impl Interceptor for NormalizeEmail {
    fn events(&self) -> &[Event] {
        &[Event::PrePersist, Event::PreUpdate]
    }

    fn on_event(&self, entity: &mut dyn Entity) {
        let lowered = match entity.value("email") {
            Some(FieldValue::Text(email)) if email.chars().any(char::is_uppercase) => email.to_lowercase(),
            _ => return,
        };
        entity.set_value("email", FieldValue::Text(lowered));
    }
}

const ALL_EVENTS: [Event; 6] = [
    Event::PrePersist,
    Event::PostPersist,
    Event::PreUpdate,
    Event::PostUpdate,
    Event::PreRemove,
    Event::PostRemove,
];

/// `users`: scalar, collection and counter columns, counters kept in
/// `users_counters`.
pub fn user_meta(log: &Arc<EventLog>) -> Result<EntityMeta, CoreError> {
    let mut builder = EntityMeta::builder(USER, "users")
        .partition_key("id", FieldType::Int)
        .property("name", FieldType::Text)
        .property("email", FieldType::Text)
        .property("tags", FieldType::set(FieldType::Text))
        .property("scores", FieldType::list(FieldType::Int))
        .property("preferences", FieldType::map(FieldType::Text, FieldType::Text))
        .counter("logins")
        .interceptor(Arc::new(NormalizeEmail));
    for event in ALL_EVENTS {
        builder = builder.interceptor(Arc::new(LogEvent {
            events: [event],
            log: Arc::clone(log),
        }));
    }
    builder.build()
}

/// `tweets`: one partition per author, newest first.
pub fn tweet_meta() -> Result<EntityMeta, CoreError> {
    EntityMeta::builder(TWEET, "tweets")
        .partition_key("author", FieldType::Int)
        .clustering_key("id", FieldType::Uuid, ClusteringOrder::Desc)
        .property("content", FieldType::Text)
        .property("mentions", FieldType::list(FieldType::Text))
        .consistency(ConsistencyLevel::LocalOne, ConsistencyLevel::LocalQuorum)
        .build()
}

/// `page_views`: a clustered counter entity, every non-key column a counter.
pub fn page_view_meta() -> Result<EntityMeta, CoreError> {
    EntityMeta::builder(PAGE_VIEW, "page_views")
        .partition_key("page", FieldType::Text)
        .clustering_key("day", FieldType::Text, ClusteringOrder::Asc)
        .counter("views")
        .declare(PropertyDecl::new("clicks", FieldType::Counter).write_consistency(ConsistencyLevel::All))
        .build()
}

pub fn registry(log: &Arc<EventLog>) -> Result<EntityRegistry, CoreError> {
    let mut registry = EntityRegistry::new();
    registry.register(user_meta(log)?)?;
    registry.register(tweet_meta()?)?;
    registry.register(page_view_meta()?)?;
    Ok(registry)
}

/// A user not yet written.
pub fn new_user(id: i32, name: &str, email: &str) -> Arc<Mutex<Record>> {
    Arc::new(Mutex::new(
        Record::new(USER)
            .with("id", FieldValue::Int(id))
            .with("name", FieldValue::text(name))
            .with("email", FieldValue::text(email)),
    ))
}

/// A user as read back from the store, with every collection populated.
pub fn loaded_user(id: i32, name: &str) -> Arc<Mutex<Record>> {
    Arc::new(Mutex::new(Record::loaded(
        USER,
        [
            ("id".to_string(), FieldValue::Int(id)),
            ("name".to_string(), FieldValue::text(name)),
            ("email".to_string(), FieldValue::text(format!("{}@example.com", name.to_lowercase()))),
            ("tags".to_string(), FieldValue::set_of([FieldValue::text("admin")])),
            ("scores".to_string(), FieldValue::List(vec![FieldValue::Int(10), FieldValue::Int(20), FieldValue::Int(30)])),
            (
                "preferences".to_string(),
                FieldValue::map_of([(FieldValue::text("theme"), FieldValue::text("dark"))]),
            ),
        ],
    )))
}

pub fn new_tweet(author: i32, content: &str) -> Arc<Mutex<Record>> {
    Arc::new(Mutex::new(
        Record::new(TWEET)
            .with("author", FieldValue::Int(author))
            .with("id", FieldValue::Uuid(Uuid::now_v7()))
            .with("content", FieldValue::text(content)),
    ))
}

pub fn page_view(page: &str, day: &str) -> Arc<Mutex<Record>> {
    Arc::new(Mutex::new(Record::loaded(
        PAGE_VIEW,
        [
            ("page".to_string(), FieldValue::text(page)),
            ("day".to_string(), FieldValue::text(day)),
        ],
    )))
}
