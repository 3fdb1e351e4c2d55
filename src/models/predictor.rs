//! Fare predictor client.
//!
//! Wraps one call to the external prediction service per trip. Failures are
//! logged and folded into [`PredictionOutcome::Unavailable`]; they never
//! reach the caller as errors.

use crate::error::PredictError;
use crate::feature_extractor::{FeatureExtractor, FeatureVector};
use crate::types::trip::TripEvent;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Transport to the prediction service: CSV request body in, raw response
/// body out.
#[async_trait]
pub trait PredictionEndpoint: Send + Sync {
    async fn invoke(&self, body: String) -> Result<String, PredictError>;
}

#[async_trait]
impl<E: PredictionEndpoint + ?Sized> PredictionEndpoint for std::sync::Arc<E> {
    async fn invoke(&self, body: String) -> Result<String, PredictError> {
        (**self).invoke(body).await
    }
}

/// Result of asking the service for a fare.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PredictionOutcome {
    Predicted(f64),
    Unavailable,
}

impl PredictionOutcome {
    pub fn fare(&self) -> Option<f64> {
        match self {
            PredictionOutcome::Predicted(fare) => Some(*fare),
            PredictionOutcome::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, PredictionOutcome::Predicted(_))
    }
}

/// Client that turns a trip into a predicted fare.
pub struct FarePredictor<E> {
    endpoint: E,
    extractor: FeatureExtractor,
    timeout: Duration,
}

impl<E: PredictionEndpoint> FarePredictor<E> {
    /// Create a predictor; every call is bounded by `timeout`.
    pub fn new(endpoint: E, timeout: Duration) -> Self {
        Self {
            endpoint,
            extractor: FeatureExtractor::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Predict the fare for a trip.
    pub async fn predict(&self, trip: &TripEvent) -> PredictionOutcome {
        let features = self.extractor.extract(trip);

        match self.request(&features).await {
            Ok(fare) => {
                debug!(features = %features, predicted_fare = fare, "Fare predicted");
                PredictionOutcome::Predicted(fare)
            }
            Err(e) => {
                warn!(features = %features, error = %e, "Fare prediction unavailable");
                PredictionOutcome::Unavailable
            }
        }
    }

    async fn request(&self, features: &FeatureVector) -> Result<f64, PredictError> {
        let body = tokio::time::timeout(self.timeout, self.endpoint.invoke(features.to_csv()))
            .await
            .map_err(|_| PredictError::Timeout(self.timeout))??;

        parse_prediction(&body)
    }
}

/// Parse a response body holding a single float.
pub fn parse_prediction(body: &str) -> Result<f64, PredictError> {
    let trimmed = body.trim();
    let fare: f64 = trimmed
        .parse()
        .map_err(|e: std::num::ParseFloatError| PredictError::invalid_response(trimmed, e.to_string()))?;

    if !fare.is_finite() {
        return Err(PredictError::invalid_response(trimmed, "not a finite number"));
    }

    Ok(fare)
}
