//! Configuration types for progress reporters and logging.

use serde::{Deserialize, Serialize};

use crate::core::FailurePolicy;
use crate::errors::ConfigError;

/// Configuration for the bundled progress reporters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Policy applied where a stage or item says [`FailurePolicy::Parent`].
    #[serde(default = "default_policy")]
    pub default_policy: FailurePolicy,
    /// Whether a failure under [`FailurePolicy::Fail`] requests cancellation.
    #[serde(default = "default_abort_on_failure")]
    pub abort_on_failure: bool,
    /// Whether the recording reporter also emits tracing events.
    #[serde(default)]
    pub log_events: bool,
    /// Level used for non-failure events: a tracing level name, case-insensitive.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Maximum number of items kept per recorded stage.
    #[serde(default = "default_max_recorded_items")]
    pub max_recorded_items: usize,
}

fn default_policy() -> FailurePolicy {
    FailurePolicy::SkipItem
}

fn default_abort_on_failure() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_recorded_items() -> usize {
    10_000
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            default_policy: default_policy(),
            abort_on_failure: default_abort_on_failure(),
            log_events: false,
            log_level: default_log_level(),
            max_recorded_items: default_max_recorded_items(),
        }
    }
}

impl ProgressConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values serde cannot: the log level must name a tracing level.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.log_level
            .parse::<tracing::Level>()
            .map(|_| ())
            .map_err(|_| ConfigError::Level(self.log_level.clone()))
    }

    /// Sets the default failure policy.
    #[must_use]
    pub fn with_default_policy(mut self, policy: FailurePolicy) -> Self {
        self.default_policy = policy;
        self
    }

    /// Sets whether failures under the `Fail` policy abort the job.
    #[must_use]
    pub fn with_abort_on_failure(mut self, abort: bool) -> Self {
        self.abort_on_failure = abort;
        self
    }

    /// Enables or disables tracing output from the recording reporter.
    #[must_use]
    pub fn with_log_events(mut self, enabled: bool) -> Self {
        self.log_events = enabled;
        self
    }

    /// Sets the level for non-failure events.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Caps the number of items recorded per stage.
    #[must_use]
    pub fn with_max_recorded_items(mut self, max: usize) -> Self {
        self.max_recorded_items = max;
        self
    }

    /// The configured level as a tracing level; names that fail
    /// [`ProgressConfig::validate`] fall back to info.
    #[must_use]
    pub fn level(&self) -> tracing::Level {
        self.log_level
            .parse::<tracing::Level>()
            .unwrap_or(tracing::Level::INFO)
    }
}

/// Configuration for the global tracing subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
    /// Include the event target in output.
    #[serde(default = "default_with_target")]
    pub with_target: bool,
}

fn default_filter() -> String {
    "info".to_string()
}

fn default_with_target() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
            with_target: default_with_target(),
        }
    }
}

impl LoggingConfig {
    /// Creates a logging configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fallback filter directive.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Switches JSON output on or off.
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }
}
