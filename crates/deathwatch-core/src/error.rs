//! Error types for shutdown coordination.
//!
//! Only [`ReleaseError`] is ever returned from a shutdown entry point. Failures
//! reported by an individual resource are logged and absorbed by the release
//! coordinator, so they have no variant here.

use std::time::Duration;

use snafu::prelude::*;

use crate::resource::ResourceLabel;
use crate::signal::Signal;

/// Boxed error returned by a resource's release operation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ============ Release Errors ============

/// Errors that can occur while releasing a batch of resources.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ReleaseError {
    /// Some resources did not confirm release before the deadline.
    #[snafu(display(
        "Failed to release {} resource(s) within {timeout:?}: {}",
        unresolved.len(),
        join_labels(unresolved)
    ))]
    Timeout {
        timeout: Duration,
        unresolved: Vec<ResourceLabel>,
    },
}

impl ReleaseError {
    /// Resources that never confirmed release, ordered by their batch index.
    pub fn unresolved(&self) -> &[ResourceLabel] {
        match self {
            ReleaseError::Timeout { unresolved, .. } => unresolved,
        }
    }
}

fn join_labels(labels: &[ResourceLabel]) -> String {
    labels
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// ============ Signal Errors ============

/// Errors that can occur while subscribing to process signals.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SignalError {
    /// The OS refused to install a handler for the signal.
    #[snafu(display("Failed to subscribe to {signal}: {source}"))]
    Subscribe {
        signal: Signal,
        source: std::io::Error,
    },

    /// The signal has no equivalent on this platform.
    #[snafu(display("{signal} is not supported on this platform"))]
    Unsupported { signal: Signal },
}

// ============ Config Errors ============

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Release timeout must be positive.
    #[snafu(display("timeout_ms must be greater than zero"))]
    ZeroTimeout,

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML: {source}"))]
    YamlParse { source: serde_yaml::Error },

    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file {}: {source}", path.display()))]
    ReadFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}
