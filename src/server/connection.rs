// Connection handling module
// Accepts a single TCP connection and serves it with the gateway service

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::service::TowerToHyperService;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::signal::Shutdown;
use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Accept a connection, enforcing the connection limit.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `state` - Shared application state
/// * `conn_counter` - Active connection counter
/// * `shutdown` - Closes the connection once idle after shutdown is requested
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: std::net::SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
    shutdown: &Arc<Shutdown>,
) {
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            // Exceeded limit: rollback counter and reject
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_connection_rejected(prev_count, max_conn);
            drop(stream);
            return;
        }
    }

    tracing::trace!(peer = %peer_addr, "connection accepted");
    handle_connection(
        stream,
        peer_addr,
        Arc::clone(state),
        Arc::clone(conn_counter),
        Arc::clone(shutdown),
    );
}

/// Serve a single connection in a spawned task.
///
/// The connection counter is decremented when the connection closes. On
/// shutdown, in-flight requests finish and idle keep-alive connections close.
fn handle_connection(
    stream: tokio::net::TcpStream,
    peer_addr: std::net::SocketAddr,
    state: Arc<AppState>,
    conn_counter: Arc<AtomicUsize>,
    shutdown: Arc<Shutdown>,
) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);
        let perf = &state.config.performance;

        let mut builder = http1::Builder::new();
        builder.keep_alive(perf.keep_alive);
        if perf.read_timeout > 0 {
            builder
                .timer(TokioTimer::new())
                .header_read_timeout(Duration::from_secs(perf.read_timeout));
        }

        let service = TowerToHyperService::new(handler::service::<Incoming>(
            Arc::clone(&state),
            peer_addr,
        ));
        let conn = builder.serve_connection(io, service);
        tokio::pin!(conn);

        let result = tokio::select! {
            res = conn.as_mut() => res,
            () = shutdown.wait() => {
                conn.as_mut().graceful_shutdown();
                conn.as_mut().await
            }
        };
        if let Err(err) = result {
            logger::log_connection_error(&err);
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}
