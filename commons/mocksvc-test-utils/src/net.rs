use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::{Duration, Instant};

/// Hold a plain listener on an ephemeral port that never answers HTTP. Used
/// to occupy a port an acquisition is told to use.
pub fn occupy_port() -> anyhow::Result<(TcpListener, u16)> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    Ok((listener, port))
}

/// Split `http://host:port` into a socket address.
pub fn endpoint_addr(endpoint_url: &str) -> anyhow::Result<SocketAddr> {
    let authority = endpoint_url
        .strip_prefix("http://")
        .ok_or_else(|| anyhow::anyhow!("not an http url: {endpoint_url}"))?;
    Ok(authority.trim_end_matches('/').parse()?)
}

pub fn can_connect(addr: SocketAddr) -> bool {
    TcpStream::connect_timeout(&addr, Duration::from_millis(500)).is_ok()
}

/// Poll until connecting to `addr` is refused or `timeout` elapses. Returns
/// whether the port ended up closed.
pub fn wait_until_refused(addr: SocketAddr, timeout: Duration) -> bool {
    let start = Instant::now();
    loop {
        if !can_connect(addr) {
            return true;
        }
        if start.elapsed() >= timeout {
            tracing::warn!(
                %addr,
                "still accepting connections after {timeout:?}"
            );
            return false;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}
