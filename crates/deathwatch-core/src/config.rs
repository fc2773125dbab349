//! Shutdown configuration.
//!
//! Hosts usually embed [`ShutdownConfig`] under a `shutdown:` key in their own
//! YAML config, but it can also be loaded on its own.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use snafu::{ResultExt, ensure};

use crate::error::{ConfigError, ReadFileSnafu, YamlParseSnafu, ZeroTimeoutSnafu};
use crate::signal::Signal;

/// Default time allowed for the whole release batch.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for a [`ShutdownController`](crate::ShutdownController).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShutdownConfig {
    /// Milliseconds allowed for all resources to release (default: 10000).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Signals that trigger shutdown (default: interrupt, terminate).
    #[serde(default = "Signal::default_set")]
    pub signals: Vec<Signal>,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            signals: Signal::default_set(),
        }
    }
}

impl ShutdownConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(contents).context(YamlParseSnafu)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
        Self::from_yaml(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(self.timeout_ms > 0, ZeroTimeoutSnafu);
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT.as_millis() as u64
}
