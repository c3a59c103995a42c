//! Batch orchestrator: extract, dedup, dispatch, then report counters.
use crate::dispatch::Dispatcher;
use crate::extract::classify;
use crate::model::{BatchCounters, InputRecord, InvocationContext};
use crate::store::DedupGateway;
use crate::telemetry::MetricsSink;
use crate::workflow::WorkflowEngine;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Processes one batch per call. Collaborators are injected so tests can
/// swap in fakes.
#[derive(Clone)]
pub struct BatchHandler {
    dedup: DedupGateway,
    dispatcher: Dispatcher,
    metrics: Arc<dyn MetricsSink>,
}

impl BatchHandler {
    pub fn new(
        dedup: DedupGateway,
        workflow: Arc<dyn WorkflowEngine>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            dispatcher: Dispatcher::new(workflow, dedup.clone()),
            dedup,
            metrics,
        }
    }

    /// Run one invocation over `records`.
    ///
    /// Candidates are handled strictly in order. A workflow start error
    /// aborts the batch: later candidates are left untouched and no
    /// counters are emitted.
    #[instrument(skip_all, fields(request_id = %ctx.request_id))]
    pub async fn handle(
        &self,
        records: &[InputRecord],
        ctx: &InvocationContext,
    ) -> Result<BatchCounters> {
        let mut counters = BatchCounters {
            total: records.len() as u64,
            ..Default::default()
        };

        for record in records {
            let classification = classify(record);
            counters.no_image += classification.no_image();

            for candidate in classification.into_candidates() {
                let lookup = self.dedup.lookup(&candidate.image_url).await;
                if lookup.seen {
                    debug!(image_url = %candidate.image_url, "already seen; skipping");
                    counters.skipped += 1;
                    continue;
                }
                let request = candidate.into_request();
                self.dispatcher
                    .dispatch(&request)
                    .await
                    .with_context(|| format!("dispatch of {} failed", request.identifier))?;
                counters.processed += 1;
            }
        }

        info!(
            tweets = counters.total,
            processed = counters.processed,
            skipped = counters.skipped,
            no_image = counters.no_image,
            "batch complete"
        );
        self.metrics.emit(ctx, &counters);
        Ok(counters)
    }

    /// Runtime-facing entry point: `true` once the batch completed.
    pub async fn invoke(&self, records: &[InputRecord], ctx: &InvocationContext) -> Result<bool> {
        self.handle(records, ctx).await.map(|_| true)
    }
}
