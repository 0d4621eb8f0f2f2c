//! Core HTTP configuration structure and field definitions

use std::time::Duration;

/// Default `User-Agent` sent on CONNECT requests and application requests.
pub const DEFAULT_USER_AGENT: &str = concat!("viaduct/", env!("CARGO_PKG_VERSION"));

/// HTTP client configuration
///
/// Shared by both transports. Timeouts bound each phase of connection
/// establishment separately so that a slow proxy surfaces as a tunnel
/// failure rather than a generic request timeout.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Whole request timeout, connection establishment included
    pub timeout: Duration,

    /// TCP connect timeout, to the proxy or the origin
    pub connect_timeout: Duration,

    /// Bound on the CONNECT exchange with the proxy
    pub tunnel_timeout: Duration,

    /// Bound on the TLS handshake, direct or tunneled
    pub tls_handshake_timeout: Duration,

    /// Enable `TCP_NODELAY`
    pub tcp_nodelay: bool,

    /// User agent string
    pub user_agent: String,

    /// Upper bound on the CONNECT response head (and drained error body)
    pub max_connect_response_size: usize,

    /// HTTP/2 connection settings
    pub http2: Http2Settings,
}

/// HTTP/2 settings applied when the multiplexed transport performs its handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Http2Settings {
    /// Initial stream-level flow-control window
    pub initial_stream_window_size: u32,

    /// Initial connection-level flow-control window
    pub initial_connection_window_size: u32,

    /// Maximum frame size we are willing to receive
    pub max_frame_size: u32,

    /// Maximum concurrently open locally-initiated streams
    pub max_concurrent_streams: usize,
}

impl Default for Http2Settings {
    fn default() -> Self {
        Self {
            initial_stream_window_size: 1 << 20,
            initial_connection_window_size: 4 << 20,
            max_frame_size: 16_384,
            max_concurrent_streams: 100,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            tunnel_timeout: Duration::from_secs(10),
            tls_handshake_timeout: Duration::from_secs(10),
            tcp_nodelay: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            max_connect_response_size: 64 * 1024,
            http2: Http2Settings::default(),
        }
    }
}
