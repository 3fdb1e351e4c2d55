//! HTTP transport to the fare prediction service

use crate::error::PredictError;
use crate::models::predictor::PredictionEndpoint;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tracing::info;

/// Posts CSV feature rows to a model-serving endpoint.
#[derive(Clone)]
pub struct HttpPredictionEndpoint {
    client: Client,
    url: String,
}

impl HttpPredictionEndpoint {
    /// Create an endpoint client. `timeout` caps the whole request, including
    /// reading the body.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, PredictError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        info!(url = %url, timeout_ms = timeout.as_millis() as u64, "Prediction endpoint configured");

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PredictionEndpoint for HttpPredictionEndpoint {
    async fn invoke(&self, body: String) -> Result<String, PredictError> {
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "text/csv")
            .body(body)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.text().await?)
    }
}
