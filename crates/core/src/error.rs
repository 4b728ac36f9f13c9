use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("schema error for {entity}: {reason}")]
    Schema { entity: String, reason: String },

    #[error("cannot transcode {value} with {codec} codec: {reason}")]
    Transcoding {
        codec: &'static str,
        value: String,
        reason: String,
    },

    #[error("unknown property '{property}' on {entity}")]
    UnknownProperty { entity: String, property: String },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl CoreError {
    pub(crate) fn schema(entity: &str, reason: impl Into<String>) -> Self {
        Self::Schema {
            entity: entity.to_string(),
            reason: reason.into(),
        }
    }
}
