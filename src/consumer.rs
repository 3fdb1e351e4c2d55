//! NATS consumer for incoming record batches

use crate::types::record::RecordBatch;
use anyhow::Result;
use async_nats::{Client, Subscriber};
use tracing::info;

/// Consumer for receiving record batches from NATS. Each message is one
/// invocation's batch.
pub struct RecordConsumer {
    client: Client,
    subject: String,
}

impl RecordConsumer {
    /// Create a new record consumer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the record subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Subscribed to record subject");
        Ok(subscriber)
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Parse a message payload into a record batch.
pub fn parse_batch(payload: &[u8]) -> serde_json::Result<RecordBatch> {
    serde_json::from_slice(payload)
}
