//! Trigger unit: the first signal or manual request wins.
//!
//! A background listener waits on both sources and, on the first arrival,
//! records the cause and cancels a shared [`CancellationToken`]. The token is
//! the one-shot latch every waiter observes; once cancelled it never resets.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::emit;
use crate::error::SignalError;
use crate::metrics::events::ShutdownTriggered;
use crate::signal::{Signal, SignalSet};

/// What fired the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerCause {
    /// A subscribed process signal was delivered.
    Signal(Signal),
    /// Shutdown was requested through [`ShutdownHandle::fall_on_sword`].
    Manual,
}

impl fmt::Display for TriggerCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerCause::Signal(signal) => write!(f, "{signal}"),
            TriggerCause::Manual => f.write_str("manual"),
        }
    }
}

#[derive(Default)]
struct Latch {
    fired: CancellationToken,
    cause: OnceLock<TriggerCause>,
}

impl Latch {
    fn fire(&self, cause: TriggerCause) {
        if self.cause.set(cause).is_ok() {
            emit!(ShutdownTriggered { cause });
        }
        self.fired.cancel();
    }
}

/// Cloneable handle for requesting or observing shutdown.
///
/// Hand one to any component that needs to stop the process or react to it
/// stopping.
#[derive(Clone)]
pub struct ShutdownHandle {
    manual: mpsc::Sender<()>,
    latch: Arc<Latch>,
}

impl ShutdownHandle {
    /// Subscribe to `signals` and start the listener task.
    ///
    /// Signal handlers are installed before this returns. Must be called from
    /// within a Tokio runtime.
    pub fn arm(signals: &[Signal]) -> Result<Self, SignalError> {
        let signals = SignalSet::subscribe(signals)?;
        // Capacity one: repeated requests collapse into a single pending trigger.
        let (manual, requests) = mpsc::channel(1);
        let latch = Arc::new(Latch::default());

        tokio::spawn(listen(signals, requests, Arc::clone(&latch)));

        Ok(Self { manual, latch })
    }

    /// Request shutdown without waiting for a signal.
    ///
    /// Never blocks. Extra calls, or calls after the trigger has fired, are
    /// ignored.
    pub fn fall_on_sword(&self) {
        let _ = self.manual.try_send(());
    }

    /// Wait until the trigger fires. Returns at once if it already has.
    pub async fn triggered(&self) {
        self.latch.fired.cancelled().await;
    }

    pub fn is_triggered(&self) -> bool {
        self.latch.fired.is_cancelled()
    }

    /// Why the trigger fired, or `None` while still armed.
    pub fn cause(&self) -> Option<TriggerCause> {
        self.latch.cause.get().copied()
    }

    /// A token cancelled when the trigger fires, for use with `select!` or
    /// `run_until_cancelled`.
    pub fn token(&self) -> CancellationToken {
        self.latch.fired.clone()
    }
}

impl fmt::Debug for ShutdownHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownHandle")
            .field("triggered", &self.is_triggered())
            .field("cause", &self.cause())
            .finish()
    }
}

async fn listen(mut signals: SignalSet, mut requests: mpsc::Receiver<()>, latch: Arc<Latch>) {
    let mut signals_open = true;
    let cause = loop {
        tokio::select! {
            received = signals.recv(), if signals_open => match received {
                Some(signal) => break TriggerCause::Signal(signal),
                None => signals_open = false,
            },
            request = requests.recv() => match request {
                Some(()) => break TriggerCause::Manual,
                // Every handle is gone, so nobody can observe a trigger.
                None if !signals_open => return,
                None => {
                    if let Some(signal) = signals.recv().await {
                        break TriggerCause::Signal(signal);
                    }
                    return;
                }
            },
        }
    };
    latch.fire(cause);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_starts_armed() {
        let handle = ShutdownHandle::arm(&[]).unwrap();

        assert!(!handle.is_triggered());
        assert_eq!(handle.cause(), None);

        let waited = tokio::time::timeout(Duration::from_millis(20), handle.triggered()).await;
        assert!(waited.is_err(), "trigger must not fire on its own");
    }

    #[tokio::test]
    async fn test_fall_on_sword_fires_once() {
        let handle = ShutdownHandle::arm(&[]).unwrap();

        handle.fall_on_sword();
        tokio::time::timeout(Duration::from_secs(1), handle.triggered())
            .await
            .expect("manual trigger should wake waiters");

        assert!(handle.is_triggered());
        assert_eq!(handle.cause(), Some(TriggerCause::Manual));
    }

    #[tokio::test]
    async fn test_repeated_fall_on_sword_never_blocks() {
        let handle = ShutdownHandle::arm(&[]).unwrap();

        for _ in 0..10 {
            handle.fall_on_sword();
        }
        handle.triggered().await;

        // Listener has exited; the channel is closed.
        handle.fall_on_sword();
        handle.fall_on_sword();
        assert_eq!(handle.cause(), Some(TriggerCause::Manual));
    }

    #[tokio::test]
    async fn test_clones_share_latch() {
        let handle = ShutdownHandle::arm(&[]).unwrap();
        let observer = handle.clone();
        let token = handle.token();

        let waiter = tokio::spawn(async move {
            observer.triggered().await;
            observer.cause()
        });

        handle.fall_on_sword();

        let cause = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("observer should wake")
            .expect("observer should not panic");
        assert_eq!(cause, Some(TriggerCause::Manual));
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_triggered_returns_immediately_after_fire() {
        let handle = ShutdownHandle::arm(&[]).unwrap();
        handle.fall_on_sword();
        handle.triggered().await;

        tokio::time::timeout(Duration::from_millis(10), handle.triggered())
            .await
            .expect("second wait should not block");
    }

    #[test]
    fn test_latch_keeps_first_cause() {
        let latch = Latch::default();
        latch.fire(TriggerCause::Signal(Signal::Terminate));
        latch.fire(TriggerCause::Manual);

        assert!(latch.fired.is_cancelled());
        assert_eq!(
            latch.cause.get(),
            Some(&TriggerCause::Signal(Signal::Terminate))
        );
    }

    #[test]
    fn test_cause_display() {
        assert_eq!(TriggerCause::Signal(Signal::Interrupt).to_string(), "SIGINT");
        assert_eq!(TriggerCause::Manual.to_string(), "manual");
    }
}
