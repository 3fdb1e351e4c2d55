//! Enriched output records and the per-invocation summary

use crate::models::classifier::Classification;
use crate::models::predictor::PredictionOutcome;
use crate::types::trip::TripEvent;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Keys written by enrichment. Upstream keys with these names are replaced.
const ENRICHMENT_KEYS: [&str; 4] = ["predicted_fare", "abs_error", "is_outlier", "ts"];

/// A trip event with its fare prediction and outlier verdict attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedEvent {
    #[serde(flatten)]
    pub trip: TripEvent,

    /// Fare returned by the prediction service, `null` if unavailable
    pub predicted_fare: Option<f64>,

    /// |reported - predicted|, rounded to 3 decimals
    pub abs_error: Option<f64>,

    pub is_outlier: bool,

    /// Enrichment time, milliseconds since the Unix epoch
    pub ts: i64,
}

impl EnrichedEvent {
    /// Build an enriched event stamped with the current time.
    pub fn new(trip: TripEvent, outcome: PredictionOutcome, classification: Classification) -> Self {
        Self::at(trip, outcome, classification, Utc::now().timestamp_millis())
    }

    /// Build an enriched event with an explicit timestamp.
    pub fn at(
        mut trip: TripEvent,
        outcome: PredictionOutcome,
        classification: Classification,
        ts: i64,
    ) -> Self {
        for key in ENRICHMENT_KEYS {
            trip.extra.remove(key);
        }

        Self {
            trip,
            predicted_fare: outcome.fare(),
            abs_error: classification.abs_error,
            is_outlier: classification.is_outlier,
            ts,
        }
    }

    /// Serialize as one newline-terminated JSON document.
    pub fn to_ndjson(&self) -> serde_json::Result<Vec<u8>> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }
}

/// Summary returned to the surrounding runtime after each invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResult {
    pub ok: bool,
    /// Number of records that produced enriched output
    pub n: usize,
}

impl InvocationResult {
    pub fn success(n: usize) -> Self {
        Self { ok: true, n }
    }

    pub fn failure(n: usize) -> Self {
        Self { ok: false, n }
    }
}
