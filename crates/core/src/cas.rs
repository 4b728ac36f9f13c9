use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cql::CqlValue;
use crate::field_value::FieldValue;

/// Comparison used by a lightweight-transaction precondition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CasOp {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CasOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }
}

/// `IF <column> <op> ?` precondition. The value is encoded with the
/// column's codec when the column belongs to the entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasCondition {
    pub column: String,
    pub op: CasOp,
    pub value: FieldValue,
}

impl CasCondition {
    pub fn new(column: &str, op: CasOp, value: FieldValue) -> Self {
        Self {
            column: column.to_string(),
            op,
            value,
        }
    }

    pub fn eq(column: &str, value: FieldValue) -> Self {
        Self::new(column, CasOp::Eq, value)
    }

    pub fn clause(&self) -> String {
        format!("{} {} ?", self.column, self.op.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CasOperation {
    Insert,
    Update,
}

/// Server state returned with a rejected conditional write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasResult {
    pub operation: CasOperation,
    pub current_values: BTreeMap<String, CqlValue>,
}

impl fmt::Display for CasResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CAS {:?} rejected, current values: {{", self.operation)?;
        for (i, (name, value)) in self.current_values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value:?}")?;
        }
        f.write_str("}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CasOutcome {
    Applied,
    Rejected(CasResult),
}

impl CasOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    /// Treat a rejection as an error.
    pub fn into_result(self) -> Result<(), CasResult> {
        match self {
            Self::Applied => Ok(()),
            Self::Rejected(result) => Err(result),
        }
    }
}

/// Receives the outcome of conditional writes.
pub trait CasResultListener: Send + Sync {
    fn on_success(&self) {}

    fn on_error(&self, result: &CasResult);
}
