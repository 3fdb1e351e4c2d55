//! Configuration management for the enrichment pipeline

use crate::models::classifier::DEFAULT_THRESHOLD;
use anyhow::{ensure, Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Environment variable overriding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "FARE_CONFIG";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub predictor: PredictorConfig,
    pub sink: SinkConfig,
    pub detection: DetectionConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject on which raw record batches arrive
    pub record_subject: String,
}

/// Prediction service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// URL the CSV feature row is posted to
    pub endpoint: String,
    /// Per-call timeout in milliseconds
    pub timeout_ms: u64,
}

/// Durable sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// JetStream subject for enriched chunks; unset or empty disables delivery
    #[serde(default)]
    pub subject: Option<String>,
    /// Per-chunk delivery timeout in milliseconds
    pub timeout_ms: u64,
}

/// Outlier detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Absolute fare error above which a trip is an outlier
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum number of batches processed concurrently
    pub workers: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl PredictorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl SinkConfig {
    /// Configured subject, treating an empty string as unset.
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment.
    pub fn load() -> Result<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration using a specific (optional) file.
    ///
    /// Precedence, lowest first: built-in defaults, the file,
    /// `FARE__SECTION__KEY` variables, then the deployment shorthands
    /// `PREDICTION_ENDPOINT`, `SINK_SUBJECT` and `THRESHOLD`.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let defaults =
            Config::try_from(&AppConfig::default()).context("Failed to encode default configuration")?;

        let config = Config::builder()
            .add_source(defaults)
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix("FARE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("predictor.endpoint", std::env::var("PREDICTION_ENDPOINT").ok())?
            .set_override_option("sink.subject", std::env::var("SINK_SUBJECT").ok())?
            .set_override_option("detection.threshold", std::env::var("THRESHOLD").ok())?
            .build()
            .context("Failed to build configuration")?;

        let config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.detection.threshold.is_finite() && self.detection.threshold >= 0.0,
            "detection.threshold must be a non-negative number, got {}",
            self.detection.threshold
        );
        ensure!(self.pipeline.workers >= 1, "pipeline.workers must be at least 1");
        ensure!(self.predictor.timeout_ms > 0, "predictor.timeout_ms must be positive");
        ensure!(self.sink.timeout_ms > 0, "sink.timeout_ms must be positive");
        ensure!(!self.predictor.endpoint.is_empty(), "predictor.endpoint must be set");
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                record_subject: "trips.records".to_string(),
            },
            predictor: PredictorConfig {
                endpoint: "http://localhost:8080/invocations".to_string(),
                timeout_ms: 2000,
            },
            sink: SinkConfig {
                subject: None,
                timeout_ms: 5000,
            },
            detection: DetectionConfig {
                threshold: DEFAULT_THRESHOLD,
            },
            pipeline: PipelineConfig { workers: 4 },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
        }
    }
}
