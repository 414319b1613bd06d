// Signal handling module
//
// - SIGTERM: Graceful shutdown
// - SIGINT:  Graceful shutdown (Ctrl+C)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Shutdown signal shared by the accept loop
#[derive(Default)]
pub struct Shutdown {
    notify: Notify,
    requested: AtomicBool,
}

impl Shutdown {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Request shutdown and wake every waiter
    pub fn trigger(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Resolve once shutdown has been requested
    pub async fn wait(&self) {
        let notified = self.notify.notified();
        if self.is_requested() {
            return;
        }
        notified.await;
    }
}

/// Start signal handlers (Unix)
#[cfg(unix)]
pub fn start_signal_handler(shutdown: Arc<Shutdown>) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => tracing::info!("SIGTERM received, initiating graceful shutdown"),
            _ = sigint.recv() => tracing::info!("SIGINT received, initiating graceful shutdown"),
        }
        shutdown.trigger();
    });
    Ok(())
}

/// Fallback - only handles Ctrl+C
#[cfg(not(unix))]
pub fn start_signal_handler(shutdown: Arc<Shutdown>) -> std::io::Result<()> {
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            tracing::info!("Ctrl+C received, initiating graceful shutdown");
            shutdown.trigger();
        }
    });
    Ok(())
}
