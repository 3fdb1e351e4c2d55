//! Batched sink writer for enriched events.
//!
//! Events are serialized to newline-terminated JSON and delivered in
//! contiguous chunks of at most [`MAX_CHUNK_RECORDS`], one delivery call per
//! chunk, in input order.

use crate::error::SinkError;
use crate::types::enriched::EnrichedEvent;
use async_nats::jetstream;
use async_nats::HeaderMap;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info};

/// Upper bound on records carried by a single delivery call.
pub const MAX_CHUNK_RECORDS: usize = 400;

/// Header carrying the number of NDJSON lines in a published chunk.
pub const RECORD_COUNT_HEADER: &str = "Record-Count";

/// Durable destination accepting chunks of NDJSON lines.
#[async_trait]
pub trait SinkDelivery: Send + Sync {
    /// Deliver one chunk. Each element is one newline-terminated JSON
    /// document.
    async fn deliver(&self, chunk: &[Vec<u8>]) -> anyhow::Result<()>;
}

#[async_trait]
impl<S: SinkDelivery + ?Sized> SinkDelivery for std::sync::Arc<S> {
    async fn deliver(&self, chunk: &[Vec<u8>]) -> anyhow::Result<()> {
        (**self).deliver(chunk).await
    }
}

/// Sink that publishes each chunk as one JetStream message.
pub struct JetStreamSink {
    context: jetstream::Context,
    subject: String,
}

impl JetStreamSink {
    pub fn new(client: async_nats::Client, subject: &str) -> Self {
        Self {
            context: jetstream::new(client),
            subject: subject.to_string(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

#[async_trait]
impl SinkDelivery for JetStreamSink {
    async fn deliver(&self, chunk: &[Vec<u8>]) -> anyhow::Result<()> {
        let mut payload = Vec::with_capacity(chunk.iter().map(Vec::len).sum());
        for line in chunk {
            payload.extend_from_slice(line);
        }

        let mut headers = HeaderMap::new();
        headers.insert(RECORD_COUNT_HEADER, chunk.len().to_string().as_str());

        let ack = self
            .context
            .publish_with_headers(self.subject.clone(), headers, payload.into())
            .await?
            .await?;

        debug!(
            subject = %self.subject,
            stream = %ack.stream,
            sequence = ack.sequence,
            records = chunk.len(),
            "Chunk acknowledged"
        );

        Ok(())
    }
}

/// Splits enriched events into bounded chunks and hands them to the sink.
pub struct BatchedSinkWriter<S> {
    sink: Option<S>,
    timeout: Duration,
}

impl<S: SinkDelivery> BatchedSinkWriter<S> {
    /// Create a writer. With `sink = None` every flush is a no-op.
    pub fn new(sink: Option<S>, timeout: Duration) -> Self {
        if sink.is_none() {
            info!("No sink configured, enriched events will not be delivered");
        }
        Self { sink, timeout }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Deliver `events` in chunks. Returns the number of records accepted.
    ///
    /// The first failing chunk aborts the flush; later chunks are not sent
    /// and the failed chunk is not retried here.
    pub async fn flush(&self, events: &[EnrichedEvent]) -> Result<usize, SinkError> {
        let Some(sink) = &self.sink else {
            return Ok(0);
        };
        if events.is_empty() {
            return Ok(0);
        }

        let lines = events
            .iter()
            .map(EnrichedEvent::to_ndjson)
            .collect::<Result<Vec<_>, _>>()?;

        let mut accepted = 0;
        for (index, chunk) in lines.chunks(MAX_CHUNK_RECORDS).enumerate() {
            match tokio::time::timeout(self.timeout, sink.deliver(chunk)).await {
                Ok(Ok(())) => {
                    accepted += chunk.len();
                    debug!(chunk = index, records = chunk.len(), "Chunk delivered");
                }
                Ok(Err(e)) => {
                    error!(chunk = index, records = chunk.len(), error = %e, "Chunk delivery failed");
                    return Err(SinkError::Delivery {
                        chunk: index,
                        records: chunk.len(),
                        accepted,
                        reason: format!("{e:#}"),
                    });
                }
                Err(_) => {
                    error!(chunk = index, records = chunk.len(), "Chunk delivery timed out");
                    return Err(SinkError::Timeout {
                        chunk: index,
                        accepted,
                        timeout: self.timeout,
                    });
                }
            }
        }

        Ok(accepted)
    }
}

/// Number of delivery calls needed for `records` events.
pub fn chunk_count(records: usize) -> usize {
    records.div_ceil(MAX_CHUNK_RECORDS)
}
