//! Test Trip Producer
//!
//! Generates synthetic taxi trips and publishes them to NATS as record
//! batches for pipeline testing.

use chrono::{Duration as ChronoDuration, Utc};
use fare_anomaly_pipeline::{RawRecord, RecordBatch, TripEvent};
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// Trip generator for testing
struct TripGenerator {
    rng: rand::rngs::ThreadRng,
}

impl TripGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Generate a trip priced roughly like a metered fare
    fn generate_regular(&mut self) -> TripEvent {
        let distance: f64 = (self.rng.gen_range(0.5..12.0_f64) * 100.0).round() / 100.0;
        let fare = 3.0 + 2.5 * distance + self.rng.gen_range(-1.5..1.5);
        self.build(distance, fare)
    }

    /// Generate a trip whose fare is far off the metered price
    fn generate_anomalous(&mut self) -> TripEvent {
        let distance: f64 = (self.rng.gen_range(0.5..12.0_f64) * 100.0).round() / 100.0;
        let metered = 3.0 + 2.5 * distance;
        let fare = if self.rng.gen_bool(0.5) {
            metered + self.rng.gen_range(20.0..80.0)
        } else {
            (metered - self.rng.gen_range(10.0..20.0)).max(2.5)
        };
        self.build(distance, fare)
    }

    fn build(&mut self, distance: f64, fare: f64) -> TripEvent {
        let pickup = Utc::now() - ChronoDuration::minutes(self.rng.gen_range(5..60));
        let dropoff = pickup + ChronoDuration::minutes((distance * 3.0) as i64 + 2);
        let fare = (fare * 100.0).round() / 100.0;
        let tip = (self.rng.gen_range(0.0..0.25) * fare * 100.0_f64).round() / 100.0;

        TripEvent {
            tpep_pickup_datetime: Some(pickup.format("%Y-%m-%d %H:%M:%S").to_string()),
            tpep_dropoff_datetime: Some(dropoff.format("%Y-%m-%d %H:%M:%S").to_string()),
            passenger_count: Some(self.rng.gen_range(1..=4)),
            trip_distance: Some(distance),
            pickup_zone: Some(self.rng.gen_range(1..=200)),
            dropoff_zone: Some(self.rng.gen_range(1..=200)),
            fare_amount: Some(fare),
            tip_amount: Some(tip),
            total_amount: Some(((fare + tip) * 100.0).round() / 100.0),
            payment_type: Some(self.rng.gen_range(1..=2)),
            ..Default::default()
        }
    }

    /// Build a batch, sprinkling in empty and corrupt records
    fn generate_batch(&mut self, size: usize, anomaly_rate: f64) -> anyhow::Result<RecordBatch> {
        let mut records = Vec::with_capacity(size);
        for _ in 0..size {
            let roll: f64 = self.rng.gen();
            let record = if roll < 0.01 {
                RawRecord::empty()
            } else if roll < 0.02 {
                RawRecord::from_data("corrupt-payload")
            } else if self.rng.gen_bool(anomaly_rate) {
                RawRecord::encode(&self.generate_anomalous())?
            } else {
                RawRecord::encode(&self.generate_regular())?
            };
            records.push(record);
        }
        Ok(RecordBatch::new(records))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("trip_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Trip Producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("trips.records");
    let batches: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(10);
    let batch_size: usize = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(100);
    let anomaly_rate: f64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(0.05);
    let delay_ms: u64 = args.get(6).and_then(|s| s.parse().ok()).unwrap_or(1000);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        batches = batches,
        batch_size = batch_size,
        anomaly_rate = anomaly_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let mut generator = TripGenerator::new();

    // Connect to NATS
    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            let batch = generator.generate_batch(batch_size.min(3), anomaly_rate)?;
            info!("Sample batch:\n{}", serde_json::to_string_pretty(&batch)?);
            return Ok(());
        }
    };

    for i in 0..batches {
        let batch = generator.generate_batch(batch_size, anomaly_rate)?;
        let payload = serde_json::to_vec(&batch)?;

        // Publish as a request so the pipeline's invocation result comes back
        match tokio::time::timeout(
            Duration::from_secs(30),
            client.request(subject.to_string(), payload.into()),
        )
        .await
        {
            Ok(Ok(reply)) => info!(
                batch = i + 1,
                result = %String::from_utf8_lossy(&reply.payload),
                "Batch processed"
            ),
            Ok(Err(e)) => warn!(batch = i + 1, error = %e, "Batch request failed"),
            Err(_) => warn!(batch = i + 1, "Timed out waiting for invocation result"),
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!("Completed! Published {} batches of {} records", batches, batch_size);

    Ok(())
}
