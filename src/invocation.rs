//! One pipeline invocation: enrich a batch, flush it, report the outcome

use crate::metrics::InvocationStats;
use crate::models::predictor::PredictionEndpoint;
use crate::pipeline::EnrichmentPipeline;
use crate::sink::{BatchedSinkWriter, SinkDelivery};
use crate::types::enriched::InvocationResult;
use crate::types::record::RecordBatch;
use std::time::Instant;
use tracing::error;
use uuid::Uuid;

/// Outcome of an invocation together with its statistics.
#[derive(Debug, Clone)]
pub struct InvocationReport {
    pub invocation_id: String,
    pub result: InvocationResult,
    pub stats: InvocationStats,
}

/// Handles batches end to end. Immutable, so one handler can serve
/// concurrent invocations without locking.
pub struct InvocationHandler<E, S> {
    pipeline: EnrichmentPipeline<E>,
    writer: BatchedSinkWriter<S>,
}

impl<E: PredictionEndpoint, S: SinkDelivery> InvocationHandler<E, S> {
    pub fn new(pipeline: EnrichmentPipeline<E>, writer: BatchedSinkWriter<S>) -> Self {
        Self { pipeline, writer }
    }

    /// Enrich and deliver one batch.
    pub async fn handle(&self, batch: &RecordBatch) -> InvocationReport {
        let invocation_id = Uuid::new_v4().to_string();

        let output = self.pipeline.run(&batch.records).await;
        let mut stats = output.stats;
        let processed = output.events.len();

        let flush_start = Instant::now();
        let result = match self.writer.flush(&output.events).await {
            Ok(accepted) => {
                stats.record_delivery(accepted);
                InvocationResult::success(processed)
            }
            Err(e) => {
                stats.record_delivery(e.accepted());
                error!(
                    invocation_id = %invocation_id,
                    enriched = processed,
                    error = %e,
                    "Failed to flush enriched events"
                );
                InvocationResult::failure(processed)
            }
        };
        stats.flush_time = flush_start.elapsed();

        stats.log_summary(&invocation_id, result.ok);

        InvocationReport {
            invocation_id,
            result,
            stats,
        }
    }
}
