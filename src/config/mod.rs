use std::path::PathBuf;
use std::time::Duration;

use garde::Validate;
use serde::Deserialize;

use crate::services::poller::PollSettings;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppConfig {
    /// Base URL of the job backend used by the controller.
    #[serde(default = "default_backend_url")]
    #[garde(length(min = 1))]
    pub backend_url: String,

    /// Reference backend bind address (e.g., "0.0.0.0:8000").
    #[serde(default = "default_bind_addr")]
    #[garde(skip)]
    pub bind_addr: String,

    /// Delay between two status queries, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    #[garde(range(min = 1))]
    pub poll_interval_ms: u64,

    /// Maximum time a job may stay in processing, measured from poll start.
    #[serde(default = "default_max_job_lifetime_secs")]
    #[garde(range(min = 1))]
    pub max_job_lifetime_secs: u64,

    /// Per-request timeout for backend calls.
    #[serde(default = "default_request_timeout_secs")]
    #[garde(range(min = 1))]
    pub request_timeout_secs: u64,

    /// Upload size limit enforced by the reference backend.
    #[serde(default = "default_max_upload_bytes")]
    #[garde(range(min = 1))]
    pub max_upload_bytes: usize,

    /// JSON array of items returned by the fixture analyzer.
    #[serde(default)]
    #[garde(skip)]
    pub fixture_items_path: Option<PathBuf>,

    /// Delay between two progress stages of the fixture analyzer.
    #[serde(default = "default_analyzer_step_ms")]
    #[garde(skip)]
    pub analyzer_step_ms: u64,

    /// How long finished jobs stay in the reference backend before eviction.
    #[serde(default = "default_job_retention_secs")]
    #[garde(range(min = 1))]
    pub job_retention_secs: u64,
}

fn default_backend_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_job_lifetime_secs() -> u64 {
    300
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_upload_bytes() -> usize {
    100 * 1024 * 1024
}

fn default_analyzer_step_ms() -> u64 {
    500
}

fn default_job_retention_secs() -> u64 {
    3600
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] garde::Report),
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load from explicit `NAME=value` pairs and reject out-of-range settings.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: AppConfig = envy::from_iter(vars)?;
        config.validate()?;
        Ok(config)
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_lifetime: Duration::from_secs(self.max_job_lifetime_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn job_retention(&self) -> Duration {
        Duration::from_secs(self.job_retention_secs)
    }
}
