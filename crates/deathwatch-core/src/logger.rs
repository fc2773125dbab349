//! Logging capability consumed by the shutdown controller.
//!
//! The controller only needs four severity-leveled calls. Hosts that already
//! route everything through `tracing` can keep the default [`TracingLogger`];
//! anything else can implement [`Logger`] directly.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

/// A sink for formatted log lines at four severities.
///
/// Implementations must not panic.
pub trait Logger: Send + Sync {
    fn error(&self, args: fmt::Arguments<'_>);
    fn debug(&self, args: fmt::Arguments<'_>);
    fn info(&self, args: fmt::Arguments<'_>);
    fn warn(&self, args: fmt::Arguments<'_>);
}

/// Shared, dynamically dispatched logger.
pub type LoggerRef = Arc<dyn Logger>;

/// Forwards every line to the `tracing` macros under the `deathwatch` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn error(&self, args: fmt::Arguments<'_>) {
        error!(target: "deathwatch", "{args}");
    }

    fn debug(&self, args: fmt::Arguments<'_>) {
        debug!(target: "deathwatch", "{args}");
    }

    fn info(&self, args: fmt::Arguments<'_>) {
        info!(target: "deathwatch", "{args}");
    }

    fn warn(&self, args: fmt::Arguments<'_>) {
        warn!(target: "deathwatch", "{args}");
    }
}

impl<L: Logger + ?Sized> Logger for Arc<L> {
    fn error(&self, args: fmt::Arguments<'_>) {
        (**self).error(args)
    }

    fn debug(&self, args: fmt::Arguments<'_>) {
        (**self).debug(args)
    }

    fn info(&self, args: fmt::Arguments<'_>) {
        (**self).info(args)
    }

    fn warn(&self, args: fmt::Arguments<'_>) {
        (**self).warn(args)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Severity of a captured line.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Level {
        Error,
        Debug,
        Info,
        Warn,
    }

    /// Logger that keeps every line in memory.
    #[derive(Default)]
    pub struct CapturingLogger {
        lines: Mutex<Vec<(Level, String)>>,
    }

    impl CapturingLogger {
        pub fn lines(&self, level: Level) -> Vec<String> {
            self.lines
                .lock()
                .unwrap()
                .iter()
                .filter(|(l, _)| *l == level)
                .map(|(_, line)| line.clone())
                .collect()
        }

        fn push(&self, level: Level, args: fmt::Arguments<'_>) {
            self.lines.lock().unwrap().push((level, args.to_string()));
        }
    }

    impl Logger for CapturingLogger {
        fn error(&self, args: fmt::Arguments<'_>) {
            self.push(Level::Error, args);
        }

        fn debug(&self, args: fmt::Arguments<'_>) {
            self.push(Level::Debug, args);
        }

        fn info(&self, args: fmt::Arguments<'_>) {
            self.push(Level::Info, args);
        }

        fn warn(&self, args: fmt::Arguments<'_>) {
            self.push(Level::Warn, args);
        }
    }
}
