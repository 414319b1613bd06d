// Listener module
// Creates the gateway's TCP listener

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;

/// Listen backlog
const BACKLOG: i32 = 1024;

/// Create a `TcpListener` with `SO_REUSEADDR` (and `SO_REUSEPORT` on Unix).
///
/// Lets a restarted gateway bind immediately even while old sockets sit in
/// `TIME_WAIT`, and lets a replacement process bind alongside the one it is
/// replacing.
pub fn create_reusable_listener(addr: std::net::SocketAddr) -> std::io::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(BACKLOG)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}
