//! Signal handling for graceful shutdown.
//!
//! Handlers are installed eagerly by [`SignalSet::subscribe`], so a signal that
//! arrives between construction and the first `recv()` is buffered by Tokio
//! rather than lost.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SignalError;

/// A process signal that can trigger shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    /// SIGINT, or Ctrl-C on non-Unix platforms.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// SIGQUIT.
    Quit,
    /// SIGHUP.
    Hangup,
    /// SIGUSR1.
    User1,
    /// SIGUSR2.
    User2,
}

impl Signal {
    /// Signals most services should die from.
    pub fn default_set() -> Vec<Signal> {
        vec![Signal::Interrupt, Signal::Terminate]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Interrupt => "SIGINT",
            Signal::Terminate => "SIGTERM",
            Signal::Quit => "SIGQUIT",
            Signal::Hangup => "SIGHUP",
            Signal::User1 => "SIGUSR1",
            Signal::User2 => "SIGUSR2",
        }
    }

    #[cfg(unix)]
    fn kind(&self) -> tokio::signal::unix::SignalKind {
        use tokio::signal::unix::SignalKind;

        match self {
            Signal::Interrupt => SignalKind::interrupt(),
            Signal::Terminate => SignalKind::terminate(),
            Signal::Quit => SignalKind::quit(),
            Signal::Hangup => SignalKind::hangup(),
            Signal::User1 => SignalKind::user_defined1(),
            Signal::User2 => SignalKind::user_defined2(),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(unix)]
type Listener = tokio::signal::unix::Signal;

#[cfg(not(unix))]
type Listener = tokio::signal::windows::CtrlC;

/// Installed handlers for a set of signals.
pub struct SignalSet {
    listeners: Vec<(Signal, Listener)>,
}

impl SignalSet {
    /// Install a handler for every signal in `signals`.
    ///
    /// Duplicates are subscribed once. Must be called from within a Tokio
    /// runtime.
    pub fn subscribe(signals: &[Signal]) -> Result<Self, SignalError> {
        let mut listeners: Vec<(Signal, Listener)> = Vec::with_capacity(signals.len());
        for &signal in signals {
            if listeners.iter().any(|(existing, _)| *existing == signal) {
                continue;
            }
            listeners.push((signal, listen(signal)?));
        }
        Ok(Self { listeners })
    }

    /// Signals this set is listening for.
    pub fn signals(&self) -> Vec<Signal> {
        self.listeners.iter().map(|(signal, _)| *signal).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Wait for the first delivered signal.
    ///
    /// Never resolves for an empty set. Returns `None` if the runtime's signal
    /// driver has gone away.
    pub async fn recv(&mut self) -> Option<Signal> {
        if self.listeners.is_empty() {
            return std::future::pending().await;
        }

        let waits = self.listeners.iter_mut().map(|(signal, listener)| {
            let signal = *signal;
            Box::pin(async move { listener.recv().await.map(|()| signal) })
        });
        let (received, _, _) = futures::future::select_all(waits).await;
        received
    }
}

impl fmt::Debug for SignalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalSet")
            .field("signals", &self.signals())
            .finish()
    }
}

#[cfg(unix)]
fn listen(signal: Signal) -> Result<Listener, SignalError> {
    use snafu::ResultExt;

    use crate::error::SubscribeSnafu;

    tokio::signal::unix::signal(signal.kind()).context(SubscribeSnafu { signal })
}

#[cfg(not(unix))]
fn listen(signal: Signal) -> Result<Listener, SignalError> {
    use snafu::ResultExt;

    use crate::error::{SubscribeSnafu, UnsupportedSnafu};

    match signal {
        Signal::Interrupt => tokio::signal::windows::ctrl_c().context(SubscribeSnafu { signal }),
        _ => UnsupportedSnafu { signal }.fail(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_set() {
        assert_eq!(
            Signal::default_set(),
            vec![Signal::Interrupt, Signal::Terminate]
        );
    }

    #[test]
    fn test_display_uses_conventional_names() {
        assert_eq!(Signal::Interrupt.to_string(), "SIGINT");
        assert_eq!(Signal::User2.to_string(), "SIGUSR2");
    }

    #[test]
    fn test_serde_lowercase_names() {
        let signals: Vec<Signal> = serde_json::from_str(r#"["terminate", "user1"]"#).unwrap();
        assert_eq!(signals, vec![Signal::Terminate, Signal::User1]);

        let json = serde_json::to_string(&Signal::Hangup).unwrap();
        assert_eq!(json, r#""hangup""#);
    }

    #[tokio::test]
    async fn test_subscribe_deduplicates() {
        let set = SignalSet::subscribe(&[Signal::Interrupt, Signal::Interrupt]).unwrap();
        assert_eq!(set.signals(), vec![Signal::Interrupt]);
    }

    #[tokio::test]
    async fn test_empty_set_never_resolves() {
        let mut set = SignalSet::subscribe(&[]).unwrap();
        assert!(set.is_empty());

        let result = tokio::time::timeout(Duration::from_millis(20), set.recv()).await;
        assert!(result.is_err(), "empty set should never yield a signal");
    }
}
