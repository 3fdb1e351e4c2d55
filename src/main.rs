//! Trip-Fare Anomaly Pipeline - Main Entry Point
//!
//! Consumes record batches from NATS, enriches every trip with a fare
//! prediction and outlier flag, and delivers the results to JetStream.
//! Batches are processed concurrently up to the configured worker count.

use anyhow::Result;
use fare_anomaly_pipeline::{
    config::{AppConfig, LoggingConfig},
    consumer::{parse_batch, RecordConsumer},
    models::{FarePredictor, HttpPredictionEndpoint, OutlierClassifier},
    pipeline::EnrichmentPipeline,
    sink::{BatchedSinkWriter, JetStreamSink},
    InvocationHandler, InvocationResult,
};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.logging)?;

    info!("Starting Trip-Fare Anomaly Pipeline");

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    // Initialize components
    let endpoint = HttpPredictionEndpoint::new(&config.predictor.endpoint, config.predictor.timeout())?;
    let predictor_url = endpoint.url().to_string();
    let predictor = FarePredictor::new(endpoint, config.predictor.timeout());
    let predictor_timeout = predictor.timeout();
    let pipeline = EnrichmentPipeline::new(
        predictor,
        OutlierClassifier::new(config.detection.threshold),
    );

    let sink = config
        .sink
        .subject()
        .map(|subject| JetStreamSink::new(client.clone(), subject));

    info!(
        threshold = pipeline.threshold(),
        predictor = %predictor_url,
        predictor_timeout_ms = predictor_timeout.as_millis() as u64,
        sink = sink.as_ref().map_or("<disabled>", JetStreamSink::subject),
        sink_timeout_ms = config.sink.timeout_ms,
        "Pipeline configured"
    );

    let writer = BatchedSinkWriter::new(sink, config.sink.timeout());

    let handler = Arc::new(InvocationHandler::new(pipeline, writer));

    let consumer = RecordConsumer::new(client.clone(), &config.nats.record_subject);

    let workers = config.pipeline.workers;
    info!(
        workers = workers,
        subject = %consumer.subject(),
        "Starting batch processing loop"
    );

    // Semaphore to limit concurrent invocations
    let semaphore = Arc::new(Semaphore::new(workers));
    let mut subscription = consumer.subscribe().await?;

    loop {
        let message = tokio::select! {
            message = subscription.next() => match message {
                Some(message) => message,
                None => {
                    warn!("Record subscription closed");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        };

        // Acquire permit (limits concurrent invocations)
        let permit = semaphore.clone().acquire_owned().await?;

        let handler = handler.clone();
        let client = client.clone();

        tokio::spawn(async move {
            let result = match parse_batch(&message.payload) {
                Ok(batch) => handler.handle(&batch).await.result,
                Err(e) => {
                    warn!(
                        subject = %message.subject,
                        error = %e,
                        "Rejecting malformed record batch"
                    );
                    InvocationResult::failure(0)
                }
            };

            if let Some(reply) = message.reply {
                match serde_json::to_vec(&result) {
                    Ok(body) => {
                        if let Err(e) = client.publish(reply, body.into()).await {
                            warn!(error = %e, "Failed to send invocation result");
                        }
                    }
                    Err(e) => warn!(error = %e, "Failed to encode invocation result"),
                }
            }

            // Release permit when done
            drop(permit);
        });
    }

    // Wait for in-flight invocations before exiting
    let _drained = semaphore.acquire_many(workers as u32).await?;
    client.flush().await?;
    info!("Pipeline shut down");

    Ok(())
}

/// Install the global tracing subscriber. `RUST_LOG` takes precedence over
/// the configured level.
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!("fare_anomaly_pipeline={}", logging.level))
    })?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format.as_str() {
        "json" => builder.json().init(),
        _ => builder.pretty().init(),
    }

    Ok(())
}
