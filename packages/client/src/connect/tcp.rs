//! TCP connection establishment

use std::time::Duration;

use tokio::net::TcpStream;

use crate::error::{self, Error, TimedOut};

/// Connect to `host:port`, bounded by `timeout`.
///
/// Name resolution goes through tokio's resolver and every returned address
/// is tried in order until one accepts.
pub(crate) async fn connect(
    host: &str,
    port: u16,
    timeout: Duration,
    nodelay: bool,
) -> Result<TcpStream, Error> {
    tracing::trace!(target: "viaduct::connect", host, port, "opening tcp connection");

    let stream = match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            tracing::debug!(target: "viaduct::connect", host, port, error = %e, "tcp connect failed");
            return Err(error::connect(e));
        }
        Err(_) => {
            tracing::debug!(target: "viaduct::connect", host, port, "tcp connect timed out");
            return Err(error::connect(TimedOut));
        }
    };

    if nodelay {
        stream.set_nodelay(true).map_err(error::connect)?;
    }
    Ok(stream)
}
