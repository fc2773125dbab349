//! deathwatch-core: manage the death of a long-running process.
//!
//! A [`ShutdownController`] waits for the first of a subscribed process signal
//! or an explicit [`fall_on_sword`](ShutdownController::fall_on_sword) call,
//! then releases every registered resource concurrently under one deadline.
//!
//! - `signal` - Signal set and subscription
//! - `trigger` - One-shot trigger latch and cloneable handles
//! - `resource` - The `Closeable` capability and diagnostic labels
//! - `release` - Concurrent, deadline-bounded release of a batch
//! - `controller` - The controller and its blocking entry points
//! - `logger` - Four-level logging capability
//! - `config` - YAML configuration
//! - `metrics` - Internal metric events
//! - `error` - Error types

pub mod config;
pub mod controller;
pub mod error;
pub mod logger;
pub mod metrics;
pub mod release;
pub mod resource;
pub mod signal;
pub mod tracing;
pub mod trigger;

// Re-export commonly used items
pub use config::{DEFAULT_TIMEOUT, ShutdownConfig};
pub use controller::ShutdownController;
pub use error::{BoxError, ConfigError, ReleaseError, SignalError};
pub use logger::{Logger, LoggerRef, TracingLogger};
pub use release::release_all;
pub use resource::{Closeable, CloseableRef, FnCloser, ResourceLabel, closer_fn};
pub use signal::{Signal, SignalSet};
pub use self::tracing::init_tracing;
pub use trigger::{ShutdownHandle, TriggerCause};
