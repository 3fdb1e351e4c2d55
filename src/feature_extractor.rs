//! Feature extraction for fare prediction.
//!
//! The fare model was trained on four columns in a fixed order; this module
//! builds that vector from a trip and encodes it the way the prediction
//! endpoint expects.

use crate::types::trip::TripEvent;
use std::fmt;

/// Number of features the fare model consumes.
pub const FEATURE_COUNT: usize = 4;

const DEFAULT_DISTANCE: f64 = 0.0;
const DEFAULT_PASSENGERS: u32 = 1;
const DEFAULT_ZONE: i64 = 0;

/// Model input in training order:
/// `[trip_distance, passenger_count, PULocationID, DOLocationID]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub trip_distance: f64,
    pub passenger_count: u32,
    pub pickup_zone: i64,
    pub dropoff_zone: i64,
}

impl FeatureVector {
    /// Values as floats, in model order.
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.trip_distance,
            self.passenger_count as f64,
            self.pickup_zone as f64,
            self.dropoff_zone as f64,
        ]
    }

    /// Comma-joined request body, e.g. `5.0,2,10,20`.
    pub fn to_csv(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `{:?}` keeps the decimal point on whole-number distances
        write!(
            f,
            "{:?},{},{},{}",
            self.trip_distance, self.passenger_count, self.pickup_zone, self.dropoff_zone
        )
    }
}

/// Turns trips into model input features.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract features from a trip, substituting defaults for missing fields.
    pub fn extract(&self, trip: &TripEvent) -> FeatureVector {
        FeatureVector {
            trip_distance: trip.trip_distance.unwrap_or(DEFAULT_DISTANCE),
            passenger_count: trip.passenger_count.unwrap_or(DEFAULT_PASSENGERS),
            pickup_zone: trip.pickup_zone.unwrap_or(DEFAULT_ZONE),
            dropoff_zone: trip.dropoff_zone.unwrap_or(DEFAULT_ZONE),
        }
    }

    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Feature names (matching training column order).
    pub fn feature_names(&self) -> [&'static str; FEATURE_COUNT] {
        ["trip_distance", "passenger_count", "PULocationID", "DOLocationID"]
    }
}
