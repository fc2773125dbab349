//! Internal events for shutdown metrics.
//!
//! Each event struct represents a measurable occurrence during shutdown and
//! implements [`InternalEvent`] to record the matching metric.

use metrics::{counter, gauge, histogram};
use std::time::Duration;
use tracing::trace;

use crate::trigger::TriggerCause;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Event emitted when the trigger fires.
pub struct ShutdownTriggered {
    pub cause: TriggerCause,
}

impl InternalEvent for ShutdownTriggered {
    fn emit(self) {
        trace!(cause = %self.cause, "Shutdown triggered");
        counter!("deathwatch_shutdown_triggered_total", "cause" => self.cause.to_string())
            .increment(1);
    }
}

/// Event emitted when one resource confirms release.
pub struct ResourceReleased {
    /// Resources still pending in the batch.
    pub remaining: usize,
}

impl InternalEvent for ResourceReleased {
    fn emit(self) {
        trace!(remaining = self.remaining, "Resource released");
        counter!("deathwatch_resources_released_total").increment(1);
        gauge!("deathwatch_resources_pending").set(self.remaining as f64);
    }
}

/// Event emitted when a resource's release call reported an error or panicked.
pub struct ResourceReleaseFailed;

impl InternalEvent for ResourceReleaseFailed {
    fn emit(self) {
        trace!("Resource release failed");
        counter!("deathwatch_resource_release_errors_total").increment(1);
    }
}

/// Event emitted when a batch hits its deadline with resources outstanding.
pub struct ReleaseBatchTimedOut {
    pub unresolved: usize,
}

impl InternalEvent for ReleaseBatchTimedOut {
    fn emit(self) {
        trace!(unresolved = self.unresolved, "Release batch timed out");
        counter!("deathwatch_release_timeouts_total").increment(1);
        counter!("deathwatch_resources_unresolved_total").increment(self.unresolved as u64);
    }
}

/// Event emitted when a batch finishes, successfully or not.
pub struct ReleaseBatchDuration {
    pub duration: Duration,
}

impl InternalEvent for ReleaseBatchDuration {
    fn emit(self) {
        trace!(duration_ms = self.duration.as_millis() as u64, "Release batch finished");
        histogram!("deathwatch_release_batch_duration_seconds").record(self.duration.as_secs_f64());
    }
}
