//! Enrichment orchestrator.
//!
//! Drives decode → predict → classify → enrich for every record of one
//! batch, strictly in input order, and never lets one record's failure
//! affect another. Performs no sink I/O.

use crate::decoder::decode_record;
use crate::metrics::InvocationStats;
use crate::models::classifier::OutlierClassifier;
use crate::models::predictor::{FarePredictor, PredictionEndpoint};
use crate::types::enriched::EnrichedEvent;
use crate::types::record::RawRecord;
use std::time::Instant;
use tracing::{debug, warn};

/// Enriched events for one batch, plus what happened to every input record.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentOutput {
    pub events: Vec<EnrichedEvent>,
    pub stats: InvocationStats,
}

impl EnrichmentOutput {
    /// Number of records that produced enriched output.
    pub fn processed(&self) -> usize {
        self.events.len()
    }
}

/// Per-batch enrichment driver.
pub struct EnrichmentPipeline<E> {
    predictor: FarePredictor<E>,
    classifier: OutlierClassifier,
}

impl<E: PredictionEndpoint> EnrichmentPipeline<E> {
    pub fn new(predictor: FarePredictor<E>, classifier: OutlierClassifier) -> Self {
        Self {
            predictor,
            classifier,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.classifier.threshold()
    }

    /// Enrich every decodable record of a batch.
    pub async fn run(&self, records: &[RawRecord]) -> EnrichmentOutput {
        let start = Instant::now();
        let mut stats = InvocationStats::new(records.len());
        let mut events = Vec::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            let trip = match decode_record(record) {
                Ok(Some(trip)) => trip,
                Ok(None) => {
                    debug!(record_index = index, "Record has no payload, skipping");
                    stats.record_skipped();
                    continue;
                }
                Err(e) => {
                    warn!(
                        record_index = index,
                        sequence_number = record.sequence_number().unwrap_or("-"),
                        stage = e.stage(),
                        error = %e,
                        "Dropping undecodable record"
                    );
                    stats.record_decode_failure();
                    continue;
                }
            };

            let outcome = self.predictor.predict(&trip).await;
            let classification = self.classifier.classify(trip.reported_fare(), outcome);

            stats.record_enriched(outcome.is_available(), classification.is_outlier);

            if classification.is_outlier {
                debug!(
                    record_index = index,
                    fare_amount = trip.reported_fare(),
                    predicted_fare = ?outcome.fare(),
                    abs_error = ?classification.abs_error,
                    "Fare outlier detected"
                );
            }

            events.push(EnrichedEvent::new(trip, outcome, classification));
        }

        stats.enrich_time = start.elapsed();

        EnrichmentOutput { events, stats }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PredictError;
    use crate::types::trip::TripEvent;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Predicts a fare equal to the trip distance times three, and fails for
    /// trips longer than 100 miles.
    struct PerMile;

    #[async_trait]
    impl PredictionEndpoint for PerMile {
        async fn invoke(&self, body: String) -> Result<String, PredictError> {
            let distance: f64 = body.split(',').next().unwrap().parse().unwrap();
            if distance > 100.0 {
                return Err(PredictError::Status(503));
            }
            Ok((distance * 3.0).to_string())
        }
    }

    fn pipeline() -> EnrichmentPipeline<PerMile> {
        EnrichmentPipeline::new(
            FarePredictor::new(PerMile, Duration::from_secs(1)),
            OutlierClassifier::new(10.0),
        )
    }

    fn record(distance: f64, fare: f64) -> RawRecord {
        RawRecord::encode(&TripEvent::new(distance, 1, 1, 2, fare)).unwrap()
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let output = pipeline().run(&[]).await;
        assert!(output.events.is_empty());
        assert_eq!(output.stats.records_received, 0);
    }

    #[tokio::test]
    async fn test_skips_and_drops_preserve_order() {
        let records = vec![
            record(1.0, 3.0),
            RawRecord::empty(),
            record(2.0, 6.0),
            RawRecord::from_data("%%%"),
            record(3.0, 30.0),
            RawRecord::from_data(""),
        ];

        let output = pipeline().run(&records).await;

        assert_eq!(output.processed(), 3);
        let distances: Vec<_> = output.events.iter().map(|e| e.trip.trip_distance).collect();
        assert_eq!(distances, vec![Some(1.0), Some(2.0), Some(3.0)]);

        assert_eq!(output.stats.skipped, 2);
        assert_eq!(output.stats.decode_failures, 1);
        assert_eq!(output.stats.enriched, 3);
        assert_eq!(output.stats.outliers, 1);
        assert!(output.events[2].is_outlier);
    }

    #[tokio::test]
    async fn test_prediction_failure_is_isolated() {
        let records = vec![record(1.0, 3.0), record(500.0, 900.0), record(2.0, 50.0)];

        let output = pipeline().run(&records).await;

        assert_eq!(output.processed(), 3);

        let failed = &output.events[1];
        assert_eq!(failed.predicted_fare, None);
        assert_eq!(failed.abs_error, None);
        assert!(!failed.is_outlier);

        assert_eq!(output.events[0].predicted_fare, Some(3.0));
        assert_eq!(output.events[2].abs_error, Some(44.0));
        assert!(output.events[2].is_outlier);
        assert_eq!(output.stats.predictions_unavailable, 1);
    }

    #[tokio::test]
    async fn test_events_are_timestamped() {
        let before = chrono::Utc::now().timestamp_millis();
        let output = pipeline().run(&[record(1.0, 3.0)]).await;
        let after = chrono::Utc::now().timestamp_millis();

        let ts = output.events[0].ts;
        assert!(ts >= before && ts <= after);
    }
}
