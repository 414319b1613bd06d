// Server loop module
// Accepts connections until shutdown, then drains active ones

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use super::signal::Shutdown;
use crate::config::AppState;
use crate::logger;

/// Poll interval while waiting for connections to drain
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Accept connections until `shutdown` fires, then wait for active ones
///
/// Active connections get `performance.shutdown_grace_secs` to finish; any
/// still open afterwards are abandoned when the runtime stops.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: Arc<Shutdown>,
) {
    let active_connections = Arc::new(AtomicUsize::new(0));

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(
                            stream,
                            peer_addr,
                            &state,
                            &active_connections,
                            &shutdown,
                        );
                    }
                    Err(e) => logger::log_accept_error(&e),
                }
            }

            () = shutdown.wait() => break,
        }
    }

    drop(listener);
    let grace = Duration::from_secs(state.config.performance.shutdown_grace_secs);
    drain_connections(&active_connections, grace).await;
}

/// Wait until no connection is active or `grace` elapses; returns what was left
async fn drain_connections(active: &AtomicUsize, grace: Duration) -> usize {
    logger::log_shutdown(active.load(Ordering::SeqCst));

    let drained = tokio::time::timeout(grace, async {
        while active.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(DRAIN_POLL).await;
        }
    })
    .await;

    let remaining = active.load(Ordering::SeqCst);
    if drained.is_err() {
        tracing::warn!(remaining, "grace period elapsed with connections still open");
    } else {
        tracing::info!("all connections closed");
    }
    remaining
}
