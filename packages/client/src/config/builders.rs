//! Builder methods for `HttpConfig`

use std::time::Duration;

use super::types::{Http2Settings, HttpConfig};

impl HttpConfig {
    /// Set the request timeout
    ///
    /// Controls how long to wait for a complete request/response cycle,
    /// connection establishment and tunnel negotiation included.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use viaduct_client::config::HttpConfig;
    ///
    /// let config = HttpConfig::default()
    ///     .with_timeout(Duration::from_secs(30));
    /// assert_eq!(config.timeout, Duration::from_secs(30));
    /// ```
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connection timeout
    ///
    /// Only covers the TCP handshake, to the proxy when one is used and to
    /// the origin otherwise.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the CONNECT negotiation timeout
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use viaduct_client::config::HttpConfig;
    ///
    /// let config = HttpConfig::default()
    ///     .with_tunnel_timeout(Duration::from_secs(3));
    /// assert_eq!(config.tunnel_timeout, Duration::from_secs(3));
    /// ```
    #[must_use]
    pub fn with_tunnel_timeout(mut self, timeout: Duration) -> Self {
        self.tunnel_timeout = timeout;
        self
    }

    /// Set the TLS handshake timeout
    #[must_use]
    pub fn with_tls_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.tls_handshake_timeout = timeout;
        self
    }

    /// Enable or disable `TCP_NODELAY`
    #[must_use]
    pub fn with_tcp_nodelay(mut self, nodelay: bool) -> Self {
        self.tcp_nodelay = nodelay;
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Cap the size of the CONNECT response head accepted from a proxy
    #[must_use]
    pub fn with_max_connect_response_size(mut self, size: usize) -> Self {
        self.max_connect_response_size = size;
        self
    }

    /// Replace the HTTP/2 settings
    #[must_use]
    pub fn with_http2(mut self, http2: Http2Settings) -> Self {
        self.http2 = http2;
        self
    }
}
