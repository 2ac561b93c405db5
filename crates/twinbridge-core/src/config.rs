//! Ingestion configuration.
//!
//! Settings are read once at process start. The twin service endpoint is
//! the only required setting; its absence is fatal for the whole
//! ingestion path rather than a per-message failure.

use std::str::FromStr;

use url::Url;

use crate::error::ConfigError;

/// Environment variable names
pub mod env_vars {
    pub const TWIN_SERVICE_URL: &str = "ADT_SERVICE_URL";
    pub const FANOUT_MODE: &str = "TWINBRIDGE_FANOUT_MODE";
    pub const BATCH_CONCURRENCY: &str = "TWINBRIDGE_BATCH_CONCURRENCY";
    pub const OBSERVATION_FAILURES: &str = "TWINBRIDGE_OBSERVATION_FAILURES";
    pub const REQUIRE_STATE_MODEL: &str = "TWINBRIDGE_REQUIRE_STATE_MODEL";
    pub const LOG_JSON: &str = "TWINBRIDGE_LOG_JSON";
}

/// Default values
pub mod defaults {
    /// Items processed at once within a batch (1 = sequential)
    pub const BATCH_CONCURRENCY: usize = 1;
}

/// How change notifications are fanned out to the time-series sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FanoutMode {
    /// Flattened paths of the changed twin, addressed to that twin.
    #[default]
    Direct,
    /// Values collapsed onto the capability's name, addressed to its parent.
    Capability,
}

impl FromStr for FanoutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "capability" => Ok(Self::Capability),
            other => Err(format!("unknown fan-out mode '{}'", other)),
        }
    }
}

/// What a batch does with per-item failures once every item has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Surface the single error, or an aggregate of all of them.
    #[default]
    Aggregate,
    /// Log each failure and report the batch as successful.
    LogAndContinue,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aggregate" => Ok(Self::Aggregate),
            "log" | "log_and_continue" => Ok(Self::LogAndContinue),
            other => Err(format!("unknown failure policy '{}'", other)),
        }
    }
}

/// Configuration shared by every ingestion path.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
    /// Twin service endpoint
    pub twin_service_url: Url,
    pub fanout_mode: FanoutMode,
    pub batch_concurrency: usize,
    /// Failure handling for REC observation batches
    pub observation_failures: FailurePolicy,
    /// Only propagate direct fan-out for twins of the State model
    pub require_state_model: bool,
}

impl IngestConfig {
    pub fn new(twin_service_url: Url) -> Self {
        Self {
            twin_service_url,
            fanout_mode: FanoutMode::default(),
            batch_concurrency: defaults::BATCH_CONCURRENCY,
            observation_failures: FailurePolicy::default(),
            require_state_model: false,
        }
    }

    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through a variable lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = lookup(env_vars::TWIN_SERVICE_URL)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(env_vars::TWIN_SERVICE_URL))?;
        let twin_service_url = Url::parse(raw_url.trim()).map_err(|e| ConfigError::Invalid {
            name: env_vars::TWIN_SERVICE_URL,
            reason: e.to_string(),
        })?;

        let mut config = Self::new(twin_service_url);

        if let Some(mode) = lookup(env_vars::FANOUT_MODE) {
            config.fanout_mode = mode.parse().map_err(|reason| ConfigError::Invalid {
                name: env_vars::FANOUT_MODE,
                reason,
            })?;
        }

        if let Some(concurrency) = lookup(env_vars::BATCH_CONCURRENCY) {
            let parsed: usize = concurrency.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::Invalid {
                    name: env_vars::BATCH_CONCURRENCY,
                    reason: e.to_string(),
                }
            })?;
            config.batch_concurrency = parsed.max(1);
        }

        if let Some(policy) = lookup(env_vars::OBSERVATION_FAILURES) {
            config.observation_failures = policy.parse().map_err(|reason| ConfigError::Invalid {
                name: env_vars::OBSERVATION_FAILURES,
                reason,
            })?;
        }

        if let Some(flag) = lookup(env_vars::REQUIRE_STATE_MODEL) {
            config.require_state_model = flag.trim().parse().map_err(|e: std::str::ParseBoolError| {
                ConfigError::Invalid {
                    name: env_vars::REQUIRE_STATE_MODEL,
                    reason: e.to_string(),
                }
            })?;
        }

        Ok(config)
    }

    pub fn with_fanout_mode(mut self, mode: FanoutMode) -> Self {
        self.fanout_mode = mode;
        self
    }

    pub fn with_batch_concurrency(mut self, concurrency: usize) -> Self {
        self.batch_concurrency = concurrency.max(1);
        self
    }

    pub fn with_observation_failures(mut self, policy: FailurePolicy) -> Self {
        self.observation_failures = policy;
        self
    }

    pub fn with_require_state_model(mut self, required: bool) -> Self {
        self.require_state_model = required;
        self
    }
}
