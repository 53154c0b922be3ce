//! Shutdown signalling for the HTTP server
//!
//! A [`Shutdown`] handle is cloned into every task that must stop with the
//! server. Triggering it flips a watch channel, so waiters that subscribe
//! after the trigger still observe it.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    Draining,
}

#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<ShutdownState>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ShutdownState::Running);
        Self { tx: Arc::new(tx) }
    }

    pub fn state(&self) -> ShutdownState {
        *self.tx.borrow()
    }

    /// Start draining; later calls are no-ops
    pub fn trigger(&self) {
        let changed = self.tx.send_if_modified(|state| {
            if *state == ShutdownState::Running {
                *state = ShutdownState::Draining;
                true
            } else {
                false
            }
        });

        if changed {
            info!("Initiating graceful shutdown");
        } else {
            warn!("Shutdown already in progress");
        }
    }

    /// Resolve once [`Shutdown::trigger`] has been called
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so this only fails if it was dropped
        let _ = rx.wait_for(|state| *state == ShutdownState::Draining).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Trigger `shutdown` on SIGTERM or SIGINT
#[cfg(unix)]
pub fn install_signal_handlers(shutdown: Shutdown) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    error!(error = %e, "Failed to install signal handlers");
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = sigint.recv() => info!("Received SIGINT"),
        }
        shutdown.trigger();
    });
}

/// Trigger `shutdown` on Ctrl+C
#[cfg(windows)]
pub fn install_signal_handlers(shutdown: Shutdown) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            return;
        }
        info!("Received Ctrl+C");
        shutdown.trigger();
    });
}
