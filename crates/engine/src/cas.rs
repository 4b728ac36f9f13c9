use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use quill_core::{CasOperation, CasOutcome, CasResult, CasResultListener, CoreError};
use quill_storage::{ResultSet, APPLIED_COLUMN};

use crate::error::EngineError;

/// Whether the query text carries a lightweight-transaction precondition.
pub fn is_cas(query: &str) -> bool {
    query.contains(" IF ")
}

fn operation_of(query: &str) -> CasOperation {
    if query.contains(" IF NOT EXISTS") {
        CasOperation::Insert
    } else {
        CasOperation::Update
    }
}

/// Read the outcome of a conditional write from its response.
///
/// Non-conditional queries and responses without an `[applied]` marker are
/// `Applied`. On rejection every other column of the row is decoded with the
/// store's own column types.
pub fn interpret(query: &str, result: &ResultSet) -> Result<CasOutcome, EngineError> {
    if !is_cas(query) {
        return Ok(CasOutcome::Applied);
    }
    let Some(row) = result.first_row() else {
        return Ok(CasOutcome::Applied);
    };
    if row.get_bool(APPLIED_COLUMN).unwrap_or(true) {
        return Ok(CasOutcome::Applied);
    }

    let mut current_values = BTreeMap::new();
    for (column, value) in row.iter() {
        if column.name == APPLIED_COLUMN {
            continue;
        }
        if !value.conforms_to(&column.cql_type) {
            return Err(CoreError::Transcoding {
                codec: "row",
                value: format!("{value:?}"),
                reason: format!("column '{}' is declared {}", column.name, column.cql_type),
            }
            .into());
        }
        current_values.insert(column.name.clone(), value.clone());
    }
    let rejected = CasResult {
        operation: operation_of(query),
        current_values,
    };
    debug!(%rejected, "conditional write not applied");
    Ok(CasOutcome::Rejected(rejected))
}

/// Deliver an outcome to the registered listener, if any.
pub fn notify(listener: Option<&Arc<dyn CasResultListener>>, outcome: &CasOutcome) {
    let Some(listener) = listener else {
        return;
    };
    match outcome {
        CasOutcome::Applied => listener.on_success(),
        CasOutcome::Rejected(result) => listener.on_error(result),
    }
}
