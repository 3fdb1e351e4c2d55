//! End-to-end invocation scenarios with in-memory prediction and sink doubles.

use async_trait::async_trait;
use fare_anomaly_pipeline::{
    BatchedSinkWriter, EnrichmentPipeline, FarePredictor, InvocationHandler, OutlierClassifier,
    PredictError, PredictionEndpoint, RawRecord, RecordBatch, SinkDelivery, TripEvent,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const PREDICT_TIMEOUT: Duration = Duration::from_millis(200);
const SINK_TIMEOUT: Duration = Duration::from_secs(1);

/// Prediction service double returning a fixed body, or hanging forever.
struct FixedPrediction {
    body: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl FixedPrediction {
    fn returning(value: f64) -> Arc<Self> {
        Arc::new(Self {
            body: Some(value.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn hanging() -> Arc<Self> {
        Arc::new(Self {
            body: None,
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl PredictionEndpoint for FixedPrediction {
    async fn invoke(&self, body: String) -> Result<String, PredictError> {
        self.calls.lock().unwrap().push(body);
        match &self.body {
            Some(body) => Ok(body.clone()),
            None => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(PredictError::Transport("unreachable".to_string()))
            }
        }
    }
}

/// Sink double recording every delivery call.
#[derive(Default)]
struct RecordingSink {
    chunks: Mutex<Vec<Vec<Vec<u8>>>>,
    fail: bool,
}

impl RecordingSink {
    fn chunk_sizes(&self) -> Vec<usize> {
        self.chunks.lock().unwrap().iter().map(Vec::len).collect()
    }

    fn delivered(&self) -> Vec<Value> {
        self.chunks
            .lock()
            .unwrap()
            .iter()
            .flatten()
            .map(|line| serde_json::from_slice(line).unwrap())
            .collect()
    }
}

#[async_trait]
impl SinkDelivery for RecordingSink {
    async fn deliver(&self, chunk: &[Vec<u8>]) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("stream not found");
        }
        self.chunks.lock().unwrap().push(chunk.to_vec());
        Ok(())
    }
}

fn handler(
    endpoint: Arc<FixedPrediction>,
    sink: Option<Arc<RecordingSink>>,
) -> InvocationHandler<Arc<FixedPrediction>, Arc<RecordingSink>> {
    let pipeline = EnrichmentPipeline::new(
        FarePredictor::new(endpoint, PREDICT_TIMEOUT),
        OutlierClassifier::new(10.0),
    );
    InvocationHandler::new(pipeline, BatchedSinkWriter::new(sink, SINK_TIMEOUT))
}

fn scenario_trip() -> TripEvent {
    TripEvent::new(5.0, 2, 10, 20, 25.0)
}

fn batch_of(trips: &[TripEvent]) -> RecordBatch {
    RecordBatch::new(trips.iter().map(|t| RawRecord::encode(t).unwrap()).collect())
}

#[tokio::test]
async fn scenario_a_within_threshold() {
    let endpoint = FixedPrediction::returning(20.0);
    let sink = Arc::new(RecordingSink::default());
    let handler = handler(endpoint.clone(), Some(sink.clone()));

    let report = handler.handle(&batch_of(&[scenario_trip()])).await;

    assert!(report.result.ok);
    assert_eq!(report.result.n, 1);
    assert_eq!(endpoint.calls.lock().unwrap().as_slice(), ["5.0,2,10,20".to_string()]);

    let delivered = sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0]["predicted_fare"], 20.0);
    assert_eq!(delivered[0]["abs_error"], 5.0);
    assert_eq!(delivered[0]["is_outlier"], false);
    assert_eq!(delivered[0]["fare_amount"], 25.0);
}

#[tokio::test]
async fn scenario_b_outlier() {
    let sink = Arc::new(RecordingSink::default());
    let handler = handler(FixedPrediction::returning(5.0), Some(sink.clone()));

    let report = handler.handle(&batch_of(&[scenario_trip()])).await;

    assert!(report.result.ok);
    assert_eq!(report.stats.outliers, 1);

    let delivered = sink.delivered();
    assert_eq!(delivered[0]["abs_error"], 20.0);
    assert_eq!(delivered[0]["is_outlier"], true);
}

#[tokio::test(start_paused = true)]
async fn scenario_c_prediction_timeout_still_delivers() {
    let sink = Arc::new(RecordingSink::default());
    let handler = handler(FixedPrediction::hanging(), Some(sink.clone()));

    let report = handler.handle(&batch_of(&[scenario_trip()])).await;

    assert!(report.result.ok);
    assert_eq!(report.result.n, 1);
    assert_eq!(report.stats.predictions_unavailable, 1);

    let delivered = sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0]["predicted_fare"], Value::Null);
    assert_eq!(delivered[0]["abs_error"], Value::Null);
    assert_eq!(delivered[0]["is_outlier"], false);
}

#[tokio::test]
async fn scenario_d_large_batch_is_chunked() {
    let sink = Arc::new(RecordingSink::default());
    let handler = handler(FixedPrediction::returning(20.0), Some(sink.clone()));

    let trips: Vec<TripEvent> = (0..850)
        .map(|i| TripEvent::new(1.0, 1, i, i, 25.0))
        .collect();

    let report = handler.handle(&batch_of(&trips)).await;

    assert!(report.result.ok);
    assert_eq!(report.result.n, 850);
    assert_eq!(sink.chunk_sizes(), vec![400, 400, 50]);
    assert_eq!(report.stats.chunks_delivered, 3);
    assert_eq!(report.stats.records_delivered, 850);

    let zones: Vec<i64> = sink
        .delivered()
        .iter()
        .map(|v| v["PULocationID"].as_i64().unwrap())
        .collect();
    assert_eq!(zones, (0..850).collect::<Vec<i64>>());
}

#[tokio::test]
async fn scenario_e_empty_batch() {
    let endpoint = FixedPrediction::returning(20.0);
    let sink = Arc::new(RecordingSink::default());
    let handler = handler(endpoint.clone(), Some(sink.clone()));

    let report = handler.handle(&RecordBatch::default()).await;

    assert!(report.result.ok);
    assert_eq!(report.result.n, 0);
    assert!(sink.chunk_sizes().is_empty());
    assert!(endpoint.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn skipped_and_malformed_records_are_excluded_in_order() {
    let sink = Arc::new(RecordingSink::default());
    let handler = handler(FixedPrediction::returning(20.0), Some(sink.clone()));

    let batch = RecordBatch::new(vec![
        RawRecord::encode(&TripEvent::new(1.0, 1, 1, 1, 20.0)).unwrap(),
        RawRecord::empty(),
        RawRecord::from_data("!!not-base64!!"),
        RawRecord::encode(&TripEvent::new(2.0, 1, 2, 2, 20.0)).unwrap(),
        RawRecord::from_data("bm90IGpzb24="),
        RawRecord::encode(&TripEvent::new(3.0, 1, 3, 3, 20.0)).unwrap(),
    ]);

    let report = handler.handle(&batch).await;

    assert!(report.result.ok);
    assert_eq!(report.result.n, 3);
    assert_eq!(report.stats.skipped, 1);
    assert_eq!(report.stats.decode_failures, 2);

    let zones: Vec<i64> = sink
        .delivered()
        .iter()
        .map(|v| v["PULocationID"].as_i64().unwrap())
        .collect();
    assert_eq!(zones, vec![1, 2, 3]);
}

#[tokio::test]
async fn float_encoded_integers_are_enriched() {
    use base64::Engine;

    let endpoint = FixedPrediction::returning(20.0);
    let sink = Arc::new(RecordingSink::default());
    let handler = handler(endpoint.clone(), Some(sink.clone()));

    let json = r#"{"trip_distance": 5.0, "passenger_count": 2.0, "PULocationID": 10.0, "DOLocationID": 20.0, "fare_amount": 25.0, "tip_amount": null}"#;
    let batch = RecordBatch::new(vec![RawRecord::from_data(
        base64::engine::general_purpose::STANDARD.encode(json),
    )]);

    let report = handler.handle(&batch).await;

    assert!(report.result.ok);
    assert_eq!(report.result.n, 1);
    assert_eq!(report.stats.decode_failures, 0);
    assert_eq!(endpoint.calls.lock().unwrap().as_slice(), ["5.0,2,10,20".to_string()]);

    let delivered = sink.delivered();
    assert_eq!(delivered[0]["abs_error"], 5.0);
    assert_eq!(delivered[0]["PULocationID"], 10);
    assert!(delivered[0].as_object().unwrap().contains_key("tip_amount"));
    assert_eq!(delivered[0]["tip_amount"], Value::Null);
}

#[tokio::test]
async fn sink_failure_fails_invocation() {
    let sink = Arc::new(RecordingSink {
        fail: true,
        ..Default::default()
    });
    let handler = handler(FixedPrediction::returning(20.0), Some(sink));

    let report = handler.handle(&batch_of(&[scenario_trip(), scenario_trip()])).await;

    assert!(!report.result.ok);
    assert_eq!(report.result.n, 2);
    assert_eq!(report.stats.records_delivered, 0);
}

#[tokio::test]
async fn disabled_sink_still_succeeds() {
    let handler = handler(FixedPrediction::returning(20.0), None);

    let report = handler.handle(&batch_of(&[scenario_trip()])).await;

    assert!(report.result.ok);
    assert_eq!(report.result.n, 1);
    assert_eq!(report.stats.chunks_delivered, 0);
}

#[tokio::test]
async fn concurrent_invocations_are_independent() {
    let sink = Arc::new(RecordingSink::default());
    let handler = Arc::new(handler(FixedPrediction::returning(20.0), Some(sink.clone())));

    let tasks: Vec<_> = [3usize, 5, 7]
        .into_iter()
        .map(|n| {
            let handler = handler.clone();
            tokio::spawn(async move {
                let trips = vec![scenario_trip(); n];
                handler.handle(&batch_of(&trips)).await
            })
        })
        .collect();

    let mut counts = Vec::new();
    for task in tasks {
        let report = task.await.unwrap();
        assert_eq!(report.stats.records_received, report.result.n);
        counts.push(report.result.n);
    }

    assert_eq!(counts, vec![3, 5, 7]);
    assert_eq!(sink.delivered().len(), 15);
}
