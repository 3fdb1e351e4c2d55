//! Fare prediction and outlier classification

pub mod classifier;
pub mod endpoint;
pub mod predictor;

pub use classifier::{Classification, OutlierClassifier};
pub use endpoint::HttpPredictionEndpoint;
pub use predictor::{FarePredictor, PredictionEndpoint, PredictionOutcome};
