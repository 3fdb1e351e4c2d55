//! Outlier classification from reported vs. predicted fare

use crate::models::predictor::PredictionOutcome;

/// Default outlier threshold, in the fare's currency unit (USD).
pub const DEFAULT_THRESHOLD: f64 = 10.0;

/// Decimal places kept on the absolute error.
const ERROR_DECIMALS: i32 = 3;

/// Verdict for a single trip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// Rounded absolute error, absent when no prediction was available
    pub abs_error: Option<f64>,
    pub is_outlier: bool,
}

impl Classification {
    pub fn unavailable() -> Self {
        Self {
            abs_error: None,
            is_outlier: false,
        }
    }
}

/// Flags trips whose fare deviates from the prediction by more than a
/// threshold.
#[derive(Debug, Clone, Copy)]
pub struct OutlierClassifier {
    threshold: f64,
}

impl OutlierClassifier {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Classify a reported fare against the prediction outcome.
    ///
    /// The comparison uses the rounded error so the published `abs_error`
    /// and `is_outlier` always agree. An error equal to the threshold is not
    /// an outlier.
    pub fn classify(&self, reported_fare: f64, outcome: PredictionOutcome) -> Classification {
        classify(reported_fare, outcome, self.threshold)
    }
}

impl Default for OutlierClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

/// See [`OutlierClassifier::classify`].
pub fn classify(reported_fare: f64, outcome: PredictionOutcome, threshold: f64) -> Classification {
    match outcome {
        PredictionOutcome::Unavailable => Classification::unavailable(),
        PredictionOutcome::Predicted(predicted) => {
            // Overflow saturates so the published error stays representable
            let diff = (reported_fare - predicted).abs();
            let diff = if diff.is_finite() { diff } else { f64::MAX };
            let abs_error = round_half_even(diff, ERROR_DECIMALS);
            Classification {
                abs_error: Some(abs_error),
                is_outlier: abs_error > threshold,
            }
        }
    }
}

/// Round to `decimals` places, ties to even.
pub fn round_half_even(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    let scaled = value * scale;
    if !scaled.is_finite() {
        // Too large to carry fractional digits anyway
        return value;
    }
    scaled.round_ties_even() / scale
}
