use quill_core::{ConsistencyLevel, CqlType, CqlValue};
use uuid::Uuid;

/// Name of the marker column in the response to a conditional write.
pub const APPLIED_COLUMN: &str = "[applied]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub cql_type: CqlType,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub columns: Vec<ColumnDefinition>,
    pub values: Vec<CqlValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Response row of a conditional write carrying only the marker.
    pub fn applied(applied: bool) -> Self {
        Self::new().with_column(APPLIED_COLUMN, CqlType::Boolean, CqlValue::Boolean(applied))
    }

    pub fn with_column(mut self, name: &str, cql_type: CqlType, value: CqlValue) -> Self {
        self.columns.push(ColumnDefinition {
            name: name.to_string(),
            cql_type,
        });
        self.values.push(value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&CqlValue> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .and_then(|i| self.values.get(i))
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(CqlValue::as_boolean)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ColumnDefinition, &CqlValue)> {
        self.columns.iter().zip(self.values.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub description: String,
    /// Address of the host that produced the event.
    pub source: String,
    pub source_elapsed_micros: i64,
    pub thread_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTrace {
    pub trace_id: Uuid,
    pub events: Vec<TraceEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionInfo {
    pub queried_host: String,
    pub achieved_consistency: Option<ConsistencyLevel>,
    /// `None` when tracing was off or the trace is not available yet.
    pub trace: Option<QueryTrace>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub rows: Vec<Row>,
    pub execution_info: Vec<ExecutionInfo>,
}

impl ResultSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(row: Row) -> Self {
        Self {
            rows: vec![row],
            execution_info: Vec::new(),
        }
    }

    pub fn with_execution_info(mut self, info: ExecutionInfo) -> Self {
        self.execution_info.push(info);
        self
    }

    pub fn first_row(&self) -> Option<&Row> {
        self.rows.first()
    }
}
