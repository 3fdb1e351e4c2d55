//! Per-invocation statistics.
//!
//! Each invocation owns its own [`InvocationStats`]; nothing is shared
//! between concurrent invocations.

use crate::sink::chunk_count;
use std::time::Duration;
use tracing::{info, warn};

/// Share of unavailable predictions above which an invocation is reported
/// as degraded.
const DEGRADED_PREDICTION_RATIO: f64 = 0.5;

/// Counters collected while processing one batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvocationStats {
    /// Raw records in the batch
    pub records_received: usize,
    /// Records with no payload
    pub skipped: usize,
    /// Records dropped because their payload could not be decoded
    pub decode_failures: usize,
    /// Events that produced enriched output
    pub enriched: usize,
    /// Enriched events without a prediction
    pub predictions_unavailable: usize,
    /// Enriched events flagged as outliers
    pub outliers: usize,
    /// Delivery calls accepted by the sink
    pub chunks_delivered: usize,
    /// Records accepted by the sink
    pub records_delivered: usize,
    /// Wall time spent enriching
    pub enrich_time: Duration,
    /// Wall time spent flushing
    pub flush_time: Duration,
}

impl InvocationStats {
    pub fn new(records_received: usize) -> Self {
        Self {
            records_received,
            ..Default::default()
        }
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn record_decode_failure(&mut self) {
        self.decode_failures += 1;
    }

    /// Record one enriched event.
    pub fn record_enriched(&mut self, prediction_available: bool, is_outlier: bool) {
        self.enriched += 1;
        if !prediction_available {
            self.predictions_unavailable += 1;
        }
        if is_outlier {
            self.outliers += 1;
        }
    }

    /// Record how many enriched events the sink accepted.
    pub fn record_delivery(&mut self, accepted: usize) {
        self.records_delivered = accepted;
        self.chunks_delivered = chunk_count(accepted);
    }

    /// Fraction of enriched events that had no prediction.
    pub fn unavailable_ratio(&self) -> f64 {
        if self.enriched == 0 {
            0.0
        } else {
            self.predictions_unavailable as f64 / self.enriched as f64
        }
    }

    /// Fraction of predicted events flagged as outliers.
    pub fn outlier_rate(&self) -> f64 {
        let predicted = self.enriched - self.predictions_unavailable;
        if predicted == 0 {
            0.0
        } else {
            self.outliers as f64 / predicted as f64
        }
    }

    /// Whether the prediction service looks degraded for this batch.
    pub fn is_degraded(&self) -> bool {
        self.enriched > 0 && self.unavailable_ratio() > DEGRADED_PREDICTION_RATIO
    }

    /// Log a one-line summary for the invocation.
    pub fn log_summary(&self, invocation_id: &str, ok: bool) {
        info!(
            invocation_id = %invocation_id,
            ok = ok,
            received = self.records_received,
            skipped = self.skipped,
            decode_failures = self.decode_failures,
            enriched = self.enriched,
            predictions_unavailable = self.predictions_unavailable,
            outliers = self.outliers,
            outlier_rate = format!("{:.1}%", self.outlier_rate() * 100.0),
            chunks_delivered = self.chunks_delivered,
            records_delivered = self.records_delivered,
            enrich_time_us = self.enrich_time.as_micros() as u64,
            flush_time_us = self.flush_time.as_micros() as u64,
            "Invocation complete"
        );

        if self.is_degraded() {
            warn!(
                invocation_id = %invocation_id,
                unavailable = self.predictions_unavailable,
                enriched = self.enriched,
                "Prediction service degraded: most events enriched without a prediction"
            );
        }
    }
}
