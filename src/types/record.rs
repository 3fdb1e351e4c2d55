//! Raw stream records as delivered to one invocation

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// One invocation's worth of raw records, in stream order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordBatch {
    #[serde(rename = "Records", default)]
    pub records: Vec<RawRecord>,
}

impl RecordBatch {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A stream record wrapping an opaque base64 payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "kinesis", default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<RecordPayload>,
}

/// Stream-level envelope around the encoded event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordPayload {
    /// Base64 of a UTF-8 JSON document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,

    #[serde(rename = "partitionKey", default, skip_serializing_if = "Option::is_none")]
    pub partition_key: Option<String>,

    #[serde(rename = "sequenceNumber", default, skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<String>,
}

impl RawRecord {
    /// Wrap an already-encoded payload.
    pub fn from_data(data: impl Into<String>) -> Self {
        Self {
            payload: Some(RecordPayload {
                data: Some(data.into()),
                ..Default::default()
            }),
        }
    }

    /// Serialize `event` to JSON and base64-encode it into a new record.
    pub fn encode<T: Serialize>(event: &T) -> serde_json::Result<Self> {
        let json = serde_json::to_vec(event)?;
        Ok(Self::from_data(STANDARD.encode(json)))
    }

    /// A record carrying no payload at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The encoded payload, or `None` when the record carries no data.
    pub fn data(&self) -> Option<&str> {
        self.payload
            .as_ref()
            .and_then(|p| p.data.as_deref())
            .filter(|d| !d.is_empty())
    }

    pub fn sequence_number(&self) -> Option<&str> {
        self.payload
            .as_ref()
            .and_then(|p| p.sequence_number.as_deref())
    }
}
