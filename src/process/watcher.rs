//! Background thread that turns process signals into channel messages.
//!
//! The handler itself only records the signal; translation happens on the
//! watcher thread and all reaping stays on the main thread.

use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use signal_hook::consts::{SIGCHLD, SIGINT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use tracing::debug;

/// What the main loop should do about a delivered signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    /// At least one child changed state; reap to find out which.
    ChildExited,
    /// Interrupt or termination request carrying the signal number.
    Shutdown(i32),
}

impl SignalEvent {
    pub fn from_signal(signal: i32) -> Option<Self> {
        match signal {
            SIGCHLD => Some(SignalEvent::ChildExited),
            SIGINT | SIGTERM => Some(SignalEvent::Shutdown(signal)),
            _ => None,
        }
    }
}

/// Owns the watcher thread. Dropping it stops delivery.
pub struct SignalWatcher {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl SignalWatcher {
    /// Register for SIGCHLD, SIGINT and SIGTERM and forward them to `tx`.
    pub fn spawn(tx: Sender<SignalEvent>) -> Result<Self> {
        let mut signals = Signals::new([SIGCHLD, SIGINT, SIGTERM])
            .context("failed to install signal handlers")?;
        let handle = signals.handle();
        let thread = thread::Builder::new()
            .name("signal-watcher".into())
            .spawn(move || {
                for signal in signals.forever() {
                    let Some(event) = SignalEvent::from_signal(signal) else {
                        continue;
                    };
                    debug!(signal, ?event, "signal received");
                    if tx.send(event).is_err() {
                        break;
                    }
                }
            })
            .context("failed to start signal watcher thread")?;
        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }

    /// Stop the watcher and wait for its thread to finish.
    pub fn close(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for SignalWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::time::Duration;

    #[test]
    fn classifies_watched_signals() {
        assert_eq!(SignalEvent::from_signal(SIGCHLD), Some(SignalEvent::ChildExited));
        assert_eq!(
            SignalEvent::from_signal(SIGTERM),
            Some(SignalEvent::Shutdown(SIGTERM))
        );
        assert_eq!(
            SignalEvent::from_signal(SIGINT),
            Some(SignalEvent::Shutdown(SIGINT))
        );
        assert_eq!(SignalEvent::from_signal(libc::SIGUSR1), None);
    }

    #[test]
    fn forwards_sigchld_and_stops_on_close() {
        let (tx, rx) = bounded(8);
        let watcher = SignalWatcher::spawn(tx).unwrap();
        // SAFETY: SIGCHLD is ignored by default and handled by the watcher here.
        unsafe {
            libc::raise(libc::SIGCHLD);
        }
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(2)),
            Ok(SignalEvent::ChildExited)
        );
        watcher.close();
        // Other tests fork children, so drain anything already queued.
        while rx.try_recv().is_ok() {}
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }
}
