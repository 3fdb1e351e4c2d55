//! Trip-Fare Anomaly Enrichment Pipeline
//!
//! Consumes micro-batches of taxi trip events, asks an external prediction
//! service for the expected fare, flags trips whose reported fare deviates
//! beyond a threshold, and forwards every event, enriched, to a durable sink
//! in bounded chunks.

pub mod config;
pub mod consumer;
pub mod decoder;
pub mod error;
pub mod feature_extractor;
pub mod invocation;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod sink;
pub mod types;

pub use config::AppConfig;
pub use consumer::RecordConsumer;
pub use error::{DecodeError, PredictError, SinkError};
pub use feature_extractor::{FeatureExtractor, FeatureVector};
pub use invocation::{InvocationHandler, InvocationReport};
pub use models::{FarePredictor, OutlierClassifier, PredictionEndpoint, PredictionOutcome};
pub use pipeline::{EnrichmentOutput, EnrichmentPipeline};
pub use sink::{BatchedSinkWriter, SinkDelivery};
pub use types::{EnrichedEvent, InvocationResult, RawRecord, RecordBatch, TripEvent};
