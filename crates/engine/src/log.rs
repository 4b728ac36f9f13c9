//! DML logging. Statements go to the `quill::dml` target at DEBUG; with
//! TRACE enabled on that target, statements request a query trace and the
//! returned execution info is logged too.

use tracing::{debug, enabled, trace, Level};

use quill_core::ConsistencyLevel;
use quill_storage::{BatchType, ExecutionInfo, QueryTrace, Statement, TraceEvent};

pub const DML_TARGET: &str = "quill::dml";

pub fn tracing_enabled() -> bool {
    enabled!(target: DML_TARGET, Level::TRACE)
}

pub fn log_statement(kind: &str, statement: &Statement) {
    debug!(
        target: DML_TARGET,
        kind,
        query = %statement.query,
        consistency = consistency_label(statement.consistency),
        values = ?statement.values,
        "execute"
    );
}

pub fn log_batch_start(batch_type: BatchType, consistency: ConsistencyLevel, statements: usize) {
    debug!(
        target: DML_TARGET,
        batch_type = batch_type.as_str(),
        consistency = consistency.as_str(),
        statements,
        "batch START"
    );
}

pub fn log_batch_end(batch_type: BatchType, consistency: ConsistencyLevel) {
    debug!(
        target: DML_TARGET,
        batch_type = batch_type.as_str(),
        consistency = consistency.as_str(),
        "batch END"
    );
}

pub fn log_execution_info(infos: &[ExecutionInfo]) {
    if !tracing_enabled() {
        return;
    }
    for info in infos {
        trace!(
            target: DML_TARGET,
            queried_host = %info.queried_host,
            achieved_consistency = consistency_label(info.achieved_consistency),
            "execution info"
        );
        let Some(query_trace) = &info.trace else {
            trace!(target: DML_TARGET, "query trace not available");
            continue;
        };
        for event in events_by_host(query_trace) {
            trace!(
                target: DML_TARGET,
                trace_id = %query_trace.trace_id,
                source = %event.source,
                elapsed_micros = event.source_elapsed_micros,
                thread = %event.thread_name,
                "{}",
                event.description
            );
        }
    }
}

/// Trace events grouped by source host; each host keeps its own order.
fn events_by_host(query_trace: &QueryTrace) -> Vec<&TraceEvent> {
    let mut events: Vec<&TraceEvent> = query_trace.events.iter().collect();
    events.sort_by(|a, b| a.source.cmp(&b.source));
    events
}

fn consistency_label(level: Option<ConsistencyLevel>) -> &'static str {
    level.map_or("DEFAULT", |l| l.as_str())
}
