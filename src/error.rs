//! Error types for the enrichment pipeline.
//!
//! Per-record errors ([`DecodeError`], [`PredictError`]) never escape the
//! orchestrator; only [`SinkError`] reaches the invocation boundary.

use std::time::Duration;
use thiserror::Error;

/// A raw record whose payload could not be turned into a trip event.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("payload is not a valid trip event: {0}")]
    Json(#[from] serde_json::Error),
}

impl DecodeError {
    /// Short label for the stage that failed, used as a log field.
    pub fn stage(&self) -> &'static str {
        match self {
            DecodeError::Base64(_) => "base64",
            DecodeError::Utf8(_) => "utf8",
            DecodeError::Json(_) => "json",
        }
    }
}

/// Failure of a single prediction call.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("prediction transport error: {0}")]
    Transport(String),

    #[error("prediction service returned status {0}")]
    Status(u16),

    #[error("prediction call timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid prediction response {body:?}: {reason}")]
    InvalidResponse { body: String, reason: String },
}

impl PredictError {
    pub fn invalid_response(body: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            body: body.into(),
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for PredictError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => PredictError::Status(status.as_u16()),
            None => PredictError::Transport(e.to_string()),
        }
    }
}

/// Failure while flushing enriched events to the sink. Fatal for the batch.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to serialize enriched event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("delivery of chunk {chunk} ({records} records) failed: {reason}")]
    Delivery {
        chunk: usize,
        records: usize,
        /// Records accepted by earlier chunks of the same flush
        accepted: usize,
        reason: String,
    },

    #[error("delivery of chunk {chunk} timed out after {timeout:?}")]
    Timeout {
        chunk: usize,
        accepted: usize,
        timeout: Duration,
    },
}

impl SinkError {
    /// Records the sink accepted before the flush failed.
    pub fn accepted(&self) -> usize {
        match self {
            SinkError::Serialize(_) => 0,
            SinkError::Delivery { accepted, .. } | SinkError::Timeout { accepted, .. } => *accepted,
        }
    }
}
