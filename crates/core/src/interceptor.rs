use serde::{Deserialize, Serialize};

use crate::entity::Entity;

/// Lifecycle points at which entity interceptors run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Event {
    PrePersist,
    PostPersist,
    PreUpdate,
    PostUpdate,
    PreRemove,
    PostRemove,
}

impl Event {
    /// Post events run only once the write has been committed.
    pub fn is_post(&self) -> bool {
        matches!(self, Self::PostPersist | Self::PostUpdate | Self::PostRemove)
    }
}

pub trait Interceptor: Send + Sync {
    fn events(&self) -> &[Event];

    fn on_event(&self, entity: &mut dyn Entity);
}
