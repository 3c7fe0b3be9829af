//! Configuration types
//!
//! `PumpConfig` is loaded from a YAML file; every field has a default so an
//! almost empty file is valid:
//!
//! ```yaml
//! source:
//!   base_url: https://log.example.com/v1
//!   rate_limit:
//!     requests_per_second: 50
//! pull:
//!   min_wait_secs: 20
//!   max_wait_secs: 60
//! resume:
//!   passive_wait_secs: 30
//! state_dir: ./state
//! ```

use crate::decode::DecoderFormat;
use crate::engine::LoopConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::pull::PullConfig;
use crate::types::BackoffType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete configuration loaded from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PumpConfig {
    /// Log source connection
    #[serde(default)]
    pub source: SourceConfig,

    /// Pull cycle settings
    #[serde(default)]
    pub pull: PullSettings,

    /// Resumable loop settings
    #[serde(default)]
    pub resume: ResumeSettings,

    /// Directory holding persisted instance state
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("state")
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            pull: PullSettings::default(),
            resume: ResumeSettings::default(),
            state_dir: default_state_dir(),
        }
    }
}

impl PumpConfig {
    /// Load and validate a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        self.source.validate()?;
        self.pull.validate()?;
        Ok(())
    }
}

// ============================================================================
// Source Config
// ============================================================================

/// How to reach the log service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the log service
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout in seconds (added to the fetch wait)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum number of HTTP retries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial retry delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum retry delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Retry backoff growth
    #[serde(default)]
    pub backoff: BackoffType,

    /// Optional request rate limit shared by every reader
    #[serde(default)]
    pub rate_limit: Option<RateLimiterConfig>,

    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Encoding of event bodies
    #[serde(default)]
    pub decoder: DecoderFormat,
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    60_000
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff: BackoffType::default(),
            rate_limit: None,
            headers: HashMap::new(),
            decoder: DecoderFormat::default(),
        }
    }
}

impl SourceConfig {
    /// HTTP client settings for this source
    pub fn http_client_config(&self) -> Result<HttpClientConfig> {
        let base_url = self
            .base_url
            .clone()
            .ok_or_else(|| Error::invalid_value("source.base_url", "base URL is required"))?;

        let mut builder = HttpClientConfig::builder()
            .base_url(base_url)
            .timeout(Duration::from_secs(self.timeout_secs))
            .max_retries(self.max_retries)
            .backoff(
                self.backoff,
                Duration::from_millis(self.initial_backoff_ms),
                Duration::from_millis(self.max_backoff_ms),
            );
        if let Some(rate_limit) = &self.rate_limit {
            builder = builder.rate_limit(rate_limit.clone());
        }
        for (key, value) in &self.headers {
            builder = builder.header(key, value);
        }

        Ok(builder.build())
    }

    fn validate(&self) -> Result<()> {
        if let Some(url) = &self.base_url {
            url::Url::parse(url)
                .map_err(|e| Error::invalid_value("source.base_url", e.to_string()))?;
        }
        if self.timeout_secs == 0 {
            return Err(Error::invalid_value("source.timeout_secs", "must be positive"));
        }
        if self
            .rate_limit
            .as_ref()
            .is_some_and(|r| r.requests_per_second == 0)
        {
            return Err(Error::invalid_value(
                "source.rate_limit.requests_per_second",
                "must be positive",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Pull Settings
// ============================================================================

/// Pull cycle settings as written in the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullSettings {
    /// Seconds before a cycle may stop because every partition is idle
    #[serde(default = "default_min_wait")]
    pub min_wait_secs: u64,

    /// Seconds after which a cycle always stops
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: u64,

    /// Seconds a single fetch may wait for data
    #[serde(default = "default_fetch_wait")]
    pub fetch_wait_secs: u64,

    /// Maximum events per fetch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Merge queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Reader-level retries of a failed fetch
    #[serde(default = "default_fetch_retries")]
    pub fetch_retries: u32,
}

fn default_min_wait() -> u64 {
    20
}

fn default_max_wait() -> u64 {
    60
}

fn default_fetch_wait() -> u64 {
    5
}

fn default_batch_size() -> usize {
    200
}

fn default_queue_capacity() -> usize {
    500
}

fn default_fetch_retries() -> u32 {
    3
}

impl Default for PullSettings {
    fn default() -> Self {
        Self {
            min_wait_secs: default_min_wait(),
            max_wait_secs: default_max_wait(),
            fetch_wait_secs: default_fetch_wait(),
            batch_size: default_batch_size(),
            queue_capacity: default_queue_capacity(),
            fetch_retries: default_fetch_retries(),
        }
    }
}

impl PullSettings {
    /// Convert to the engine's pull configuration
    pub fn to_pull_config(&self) -> PullConfig {
        let defaults = PullConfig::default();
        PullConfig {
            min_wait: Duration::from_secs(self.min_wait_secs),
            max_wait: Duration::from_secs(self.max_wait_secs),
            fetch_wait: Duration::from_secs(self.fetch_wait_secs),
            batch_size: self.batch_size,
            queue_capacity: self.queue_capacity,
            fetch_retries: self.fetch_retries,
            ..defaults
        }
    }

    fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(Error::invalid_value("pull.queue_capacity", "must be positive"));
        }
        if self.batch_size == 0 {
            return Err(Error::invalid_value("pull.batch_size", "must be positive"));
        }
        if self.min_wait_secs > self.max_wait_secs {
            return Err(Error::invalid_value(
                "pull.min_wait_secs",
                format!(
                    "min wait ({}s) exceeds max wait ({}s)",
                    self.min_wait_secs, self.max_wait_secs
                ),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Resume Settings
// ============================================================================

/// Resumable loop settings as written in the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeSettings {
    /// Seconds to sleep after a step that delivered nothing
    #[serde(default = "default_passive_wait")]
    pub passive_wait_secs: u64,

    /// Stop each run after this many steps
    #[serde(default)]
    pub max_iterations: Option<u64>,
}

fn default_passive_wait() -> u64 {
    30
}

impl Default for ResumeSettings {
    fn default() -> Self {
        Self {
            passive_wait_secs: default_passive_wait(),
            max_iterations: None,
        }
    }
}

impl ResumeSettings {
    /// Convert to the engine's loop configuration
    pub fn to_loop_config(&self) -> LoopConfig {
        LoopConfig {
            passive_wait: Duration::from_secs(self.passive_wait_secs),
            max_iterations: self.max_iterations,
        }
    }
}
