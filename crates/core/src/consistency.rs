use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::CoreError;
use crate::schema::EntityRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsistencyLevel {
    Any,
    One,
    Two,
    Three,
    Quorum,
    All,
    LocalOne,
    LocalQuorum,
    EachQuorum,
    Serial,
    LocalSerial,
}

impl ConsistencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "ANY",
            Self::One => "ONE",
            Self::Two => "TWO",
            Self::Three => "THREE",
            Self::Quorum => "QUORUM",
            Self::All => "ALL",
            Self::LocalOne => "LOCAL_ONE",
            Self::LocalQuorum => "LOCAL_QUORUM",
            Self::EachQuorum => "EACH_QUORUM",
            Self::Serial => "SERIAL",
            Self::LocalSerial => "LOCAL_SERIAL",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let level = match s {
            "ANY" => Self::Any,
            "ONE" => Self::One,
            "TWO" => Self::Two,
            "THREE" => Self::Three,
            "QUORUM" => Self::Quorum,
            "ALL" => Self::All,
            "LOCAL_ONE" => Self::LocalOne,
            "LOCAL_QUORUM" => Self::LocalQuorum,
            "EACH_QUORUM" => Self::EachQuorum,
            "SERIAL" => Self::Serial,
            "LOCAL_SERIAL" => Self::LocalSerial,
            _ => {
                return Err(CoreError::Serialization(format!(
                    "unknown consistency level: {s}"
                )));
            }
        };
        Ok(level)
    }

    /// Serial levels only apply to the Paxos phase of conditional writes.
    pub fn is_serial(&self) -> bool {
        matches!(self, Self::Serial | Self::LocalSerial)
    }
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three-tier consistency resolution: per-call override, then the per-table
/// map, then the process-wide default.
#[derive(Debug, Clone)]
pub struct ConsistencyResolver {
    default_read: ConsistencyLevel,
    default_write: ConsistencyLevel,
    read_map: BTreeMap<String, ConsistencyLevel>,
    write_map: BTreeMap<String, ConsistencyLevel>,
}

impl ConsistencyResolver {
    /// Levels declared on an entity fill the per-table maps, unless the
    /// configuration already names that table.
    pub fn new(config: &Config, registry: &EntityRegistry) -> Self {
        let mut read_map = config.read_consistency_map.clone();
        let mut write_map = config.write_consistency_map.clone();
        for meta in registry.iter() {
            if let Some(level) = meta.read_consistency() {
                read_map.entry(meta.table_name().to_string()).or_insert(level);
            }
            if let Some(level) = meta.write_consistency() {
                write_map.entry(meta.table_name().to_string()).or_insert(level);
            }
        }
        Self {
            default_read: config.default_read_consistency,
            default_write: config.default_write_consistency,
            read_map,
            write_map,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config, &EntityRegistry::default())
    }

    pub fn read(&self, table: &str, call_override: Option<ConsistencyLevel>) -> ConsistencyLevel {
        resolve(call_override, &self.read_map, table, self.default_read)
    }

    pub fn write(&self, table: &str, call_override: Option<ConsistencyLevel>) -> ConsistencyLevel {
        resolve(call_override, &self.write_map, table, self.default_write)
    }
}

fn resolve(
    call_override: Option<ConsistencyLevel>,
    per_table: &BTreeMap<String, ConsistencyLevel>,
    table: &str,
    default: ConsistencyLevel,
) -> ConsistencyLevel {
    call_override
        .or_else(|| per_table.get(table).copied())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FieldType;
    use crate::schema::EntityMeta;

    fn config() -> Config {
        let mut config = Config::default();
        config
            .write_consistency_map
            .insert("orders".into(), ConsistencyLevel::Quorum);
        config
            .read_consistency_map
            .insert("orders".into(), ConsistencyLevel::Quorum);
        config
    }

    #[test]
    fn three_tier_precedence() {
        let resolver = ConsistencyResolver::from_config(&config());
        assert_eq!(
            resolver.write("orders", Some(ConsistencyLevel::All)),
            ConsistencyLevel::All
        );
        assert_eq!(resolver.write("orders", None), ConsistencyLevel::Quorum);
        assert_eq!(resolver.write("customers", None), ConsistencyLevel::One);
    }

    #[test]
    fn reads_and_writes_resolve_identically() {
        let resolver = ConsistencyResolver::from_config(&config());
        for table in ["orders", "customers"] {
            for call in [None, Some(ConsistencyLevel::All)] {
                assert_eq!(resolver.read(table, call), resolver.write(table, call));
            }
        }
    }

    #[test]
    fn entity_declared_level_yields_to_configuration() {
        let mut registry = EntityRegistry::default();
        registry
            .register(
                EntityMeta::builder("Order", "orders")
                    .partition_key("id", FieldType::Uuid)
                    .consistency(ConsistencyLevel::LocalOne, ConsistencyLevel::LocalOne)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
            .register(
                EntityMeta::builder("Invoice", "invoices")
                    .partition_key("id", FieldType::Uuid)
                    .consistency(ConsistencyLevel::Two, ConsistencyLevel::Three)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let resolver = ConsistencyResolver::new(&config(), &registry);
        assert_eq!(resolver.write("orders", None), ConsistencyLevel::Quorum);
        assert_eq!(resolver.read("invoices", None), ConsistencyLevel::Two);
        assert_eq!(resolver.write("invoices", None), ConsistencyLevel::Three);
    }

    #[test]
    fn serde_uses_cql_names() {
        let json = serde_json::to_string(&ConsistencyLevel::LocalQuorum).unwrap();
        assert_eq!(json, "\"LOCAL_QUORUM\"");
    }
}
