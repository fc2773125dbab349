//! Metrics emitted while shutting down.
//!
//! Events are recorded through the `metrics` facade and are no-ops until the
//! host installs a recorder.

pub mod events;

/// Macro for emitting metric events.
///
/// Calls `InternalEvent::emit()` on the given event.
///
/// ```ignore
/// use deathwatch_core::metrics::events::ResourceReleased;
///
/// emit!(ResourceReleased { remaining: 2 });
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}
