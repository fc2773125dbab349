//! The shutdown controller and its blocking entry points.
//!
//! Create one controller at startup, pass [`ShutdownHandle`]s to whatever
//! needs to request or observe shutdown, and park the main task in
//! [`ShutdownController::wait_for_death`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use deathwatch_core::{CloseableRef, ShutdownController, Signal};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let workers = CancellationToken::new();
//! let controller = ShutdownController::new(&[Signal::Interrupt, Signal::Terminate])?
//!     .with_timeout(Duration::from_secs(5));
//!
//! let resources: Vec<CloseableRef> = vec![Arc::new(workers.clone())];
//! controller.wait_for_death(resources).await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{DEFAULT_TIMEOUT, ShutdownConfig};
use crate::error::{ReleaseError, SignalError};
use crate::logger::{Logger, LoggerRef, TracingLogger};
use crate::release::release_all;
use crate::resource::CloseableRef;
use crate::signal::Signal;
use crate::trigger::{ShutdownHandle, TriggerCause};

/// Coordinates the death of the process.
///
/// Armed on construction; fires once on the first subscribed signal or
/// [`fall_on_sword`](Self::fall_on_sword) call and never re-arms.
pub struct ShutdownController {
    timeout: Duration,
    logger: LoggerRef,
    handle: ShutdownHandle,
}

impl ShutdownController {
    /// Subscribe to `signals` and start listening.
    ///
    /// Pass an empty slice for a controller that only fires on
    /// [`fall_on_sword`](Self::fall_on_sword). Must be called from within a
    /// Tokio runtime.
    pub fn new(signals: &[Signal]) -> Result<Self, SignalError> {
        Ok(Self {
            timeout: DEFAULT_TIMEOUT,
            logger: Arc::new(TracingLogger),
            handle: ShutdownHandle::arm(signals)?,
        })
    }

    /// Build a controller from loaded configuration.
    pub fn from_config(config: &ShutdownConfig) -> Result<Self, SignalError> {
        Ok(Self::new(&config.signals)?.with_timeout(config.timeout()))
    }

    /// Override how long the release batch may take (default: 10s).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the logger (default: [`TracingLogger`]).
    pub fn with_logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// A cloneable handle sharing this controller's trigger.
    pub fn handle(&self) -> ShutdownHandle {
        self.handle.clone()
    }

    /// Request shutdown. Never blocks; repeated calls are ignored.
    pub fn fall_on_sword(&self) {
        self.handle.fall_on_sword();
    }

    pub fn is_triggered(&self) -> bool {
        self.handle.is_triggered()
    }

    pub fn cause(&self) -> Option<TriggerCause> {
        self.handle.cause()
    }

    /// Wait until a signal arrives or shutdown is requested.
    pub async fn wait_for_trigger(&self) {
        self.handle.triggered().await;
    }

    /// Wait for the trigger, then release every resource concurrently.
    ///
    /// Returns an error naming the resources that did not release within the
    /// configured timeout. Deciding whether to exit is left to the caller.
    pub async fn wait_for_death<I>(&self, resources: I) -> Result<(), ReleaseError>
    where
        I: IntoIterator<Item = CloseableRef>,
    {
        self.start_shutdown().await;

        let resources: Vec<CloseableRef> = resources.into_iter().collect();
        self.logger
            .debug(format_args!("Closing {} objects", resources.len()));
        release_all(resources, self.timeout, Arc::clone(&self.logger)).await
    }

    /// Wait for the trigger, then run `shutdown` once.
    ///
    /// No timeout applies; the callback bounds itself.
    pub async fn wait_for_death_with_func<F>(&self, shutdown: F)
    where
        F: FnOnce(),
    {
        self.start_shutdown().await;
        shutdown();
    }

    async fn start_shutdown(&self) {
        self.wait_for_trigger().await;
        if let Some(cause) = self.cause() {
            self.logger
                .debug(format_args!("Shutdown triggered by {cause}"));
        }
        self.logger.info(format_args!("Shutdown started..."));
    }
}

impl fmt::Debug for ShutdownController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownController")
            .field("timeout", &self.timeout)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}
