use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::consistency::ConsistencyLevel;

/// Which properties an INSERT binds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertStrategy {
    /// Every non-key column, absent values bound as null.
    #[default]
    AllFields,
    /// Only columns holding a non-null value.
    NotNullFields,
}

/// Process configuration, passed down explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_read_consistency: ConsistencyLevel,
    pub default_write_consistency: ConsistencyLevel,
    pub default_serial_consistency: Option<ConsistencyLevel>,
    /// Keyed by table name.
    pub read_consistency_map: BTreeMap<String, ConsistencyLevel>,
    /// Keyed by table name.
    pub write_consistency_map: BTreeMap<String, ConsistencyLevel>,
    pub insert_strategy: InsertStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_read_consistency: ConsistencyLevel::One,
            default_write_consistency: ConsistencyLevel::One,
            default_serial_consistency: None,
            read_consistency_map: BTreeMap::new(),
            write_consistency_map: BTreeMap::new(),
            insert_strategy: InsertStrategy::AllFields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "default_write_consistency": "QUORUM" }"#).unwrap();
        assert_eq!(config.default_write_consistency, ConsistencyLevel::Quorum);
        assert_eq!(config.default_read_consistency, ConsistencyLevel::One);
        assert_eq!(config.insert_strategy, InsertStrategy::AllFields);
        assert!(config.write_consistency_map.is_empty());
    }
}
