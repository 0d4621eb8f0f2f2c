//! Proxy constructor methods

use http::uri::Authority;

use super::types::{Extra, Proxy, ProxyBuilder, ProxyType};
use crate::error::{self, Error};
use crate::http::origin::{format_authority, normalize_host};

impl Proxy {
    /// A descriptor that never routes through a proxy: `{NONE, no host}`.
    #[must_use]
    pub fn no_proxy() -> Proxy {
        Proxy {
            kind: Some(ProxyType::None),
            host: None,
            port: None,
            no_proxy: None,
            extra: Extra::default(),
        }
    }

    /// A descriptor that defers to the ambient system proxy configuration.
    ///
    /// The system source is consulted on every request, so changes to the
    /// ambient registry apply without rebuilding the descriptor.
    #[must_use]
    pub fn system() -> Proxy {
        Proxy {
            kind: Some(ProxyType::System),
            host: None,
            port: None,
            no_proxy: None,
            extra: Extra::default(),
        }
    }

    /// An explicit HTTP proxy at `host:port`.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidConfiguration` error if `host` is empty or not a
    /// valid host.
    pub fn http(host: impl Into<String>, port: u16) -> Result<Proxy, Error> {
        Proxy::builder()
            .kind(ProxyType::Http)
            .host(host)
            .port(port)
            .build()
    }

    /// Start building a descriptor field by field.
    #[must_use]
    pub fn builder() -> ProxyBuilder {
        ProxyBuilder::default()
    }
}

impl ProxyBuilder {
    /// Set the type tag. Leaving it unset is allowed.
    #[must_use]
    pub fn kind(mut self, kind: ProxyType) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Set the proxy host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the proxy port. Defaults to [`DEFAULT_PROXY_PORT`](super::DEFAULT_PROXY_PORT).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Validate and freeze the descriptor.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidConfiguration` error if:
    /// - the type is [`ProxyType::Http`] and no non-empty host was given
    /// - the host (with its port) is not a valid URI authority
    pub fn build(self) -> Result<Proxy, Error> {
        let host = self
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(normalize_host);

        if self.kind == Some(ProxyType::Http) && host.is_none() {
            return Err(error::configuration("HTTP proxy requires a host"));
        }

        if let Some(host) = &host {
            let port = self.port.unwrap_or(super::DEFAULT_PROXY_PORT);
            let authority = format_authority(host, port);
            if authority.parse::<Authority>().is_err() || host.contains(['/', '@', '?', '#']) {
                return Err(error::configuration(format!("invalid proxy host: {host:?}")));
            }
        }

        Ok(Proxy {
            kind: self.kind,
            host,
            port: self.port,
            no_proxy: self.no_proxy,
            extra: self.extra,
        })
    }
}
