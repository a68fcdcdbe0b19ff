//! Span emission fan-out
//!
//! Every record in a batch gets its own task, which starts a span, copies the
//! record's properties onto it as attributes and ends it. The caller does not
//! get control back until every task has finished or the deadline passed, in
//! which case the stragglers are aborted.

use std::time::Duration;

use opentelemetry::trace::{Span, Tracer};
use opentelemetry::{Context, KeyValue};
use tokio::task::JoinSet;

use super::model::{EventBatch, EventRecord};

/// Deadline for the whole emission phase of one request
pub const DEFAULT_EMIT_TIMEOUT: Duration = Duration::from_secs(5);

/// What happened to a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitReport {
    pub requested: usize,
    pub completed: usize,
    pub timed_out: bool,
}

impl EmitReport {
    pub fn is_complete(&self) -> bool {
        !self.timed_out && self.completed == self.requested
    }
}

/// Emit one span per record and wait for all of them, at most `deadline`.
pub async fn emit<T>(
    tracer: &T,
    batch: EventBatch,
    parent_cx: &Context,
    deadline: Duration,
) -> EmitReport
where
    T: Tracer + Clone + Send + Sync + 'static,
{
    let requested = batch.len();
    let mut tasks = JoinSet::new();

    for record in batch {
        let tracer = tracer.clone();
        let cx = parent_cx.clone();
        tasks.spawn(async move { emit_record(&tracer, record, &cx) });
    }

    let mut completed = 0;
    let joined = tokio::time::timeout(deadline, async {
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(()) => completed += 1,
                Err(e) => tracing::warn!(error = %e, "Event emission task failed"),
            }
        }
    })
    .await;

    let timed_out = joined.is_err();
    if timed_out {
        tasks.abort_all();
        tracing::warn!(
            requested,
            completed,
            deadline_ms = deadline.as_millis() as u64,
            "Event emission timed out, abandoning remaining spans"
        );
    }

    EmitReport {
        requested,
        completed,
        timed_out,
    }
}

fn emit_record<T: Tracer>(tracer: &T, record: EventRecord, parent_cx: &Context) {
    let mut span = tracer.start_with_context(record.span_name(), parent_cx);
    for (key, value) in record.properties {
        span.set_attribute(KeyValue::new(key, value));
    }
    span.end();

    tracing::debug!(
        event_type = %record.event_type,
        event_name = %record.name,
        "Processed event"
    );
}
