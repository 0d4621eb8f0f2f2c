//! Proxy configuration methods
//!
//! CONNECT headers and no-proxy exclusion rules, available on both the
//! builder and the finished descriptor.

use http::{HeaderMap, header::HeaderValue};

use super::no_proxy::NoProxy;
use super::types::{Extra, Proxy, ProxyBuilder, ProxyType};

impl ProxyBuilder {
    /// Set the `Proxy-Authorization` header sent with CONNECT.
    ///
    /// The value is sent verbatim; building it for a given scheme is up to the caller.
    #[must_use]
    pub fn custom_http_auth(mut self, header_value: HeaderValue) -> Self {
        self.extra.auth = Some(header_value);
        self
    }

    /// Add headers to be sent with the CONNECT request.
    #[must_use]
    pub fn custom_headers(mut self, headers: HeaderMap) -> Self {
        merge_headers(&mut self.extra, headers);
        self
    }

    /// Set the comma separated list of hosts that bypass this proxy.
    ///
    /// See [`NoProxy::from_string`] for the pattern format.
    #[must_use]
    pub fn no_proxy_hosts<T: AsRef<str>>(mut self, exclusions: T) -> Self {
        self.no_proxy = NoProxy::from_string(exclusions.as_ref());
        self
    }
}

impl Proxy {
    /// Type tag, `None` when it was left unset.
    #[must_use]
    pub fn kind(&self) -> Option<ProxyType> {
        self.kind
    }

    /// Proxy host, if one was configured.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Proxy port, if one was configured.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Hosts that bypass this proxy.
    #[must_use]
    pub fn no_proxy_list(&self) -> Option<&NoProxy> {
        self.no_proxy.as_ref()
    }

    /// CONNECT headers.
    #[must_use]
    pub fn extra(&self) -> &Extra {
        &self.extra
    }

    /// Return a copy with the `Proxy-Authorization` header set.
    #[must_use]
    pub fn custom_http_auth(mut self, header_value: HeaderValue) -> Proxy {
        self.extra.auth = Some(header_value);
        self
    }

    /// Return a copy with extra CONNECT headers added.
    #[must_use]
    pub fn custom_headers(mut self, headers: HeaderMap) -> Proxy {
        merge_headers(&mut self.extra, headers);
        self
    }

    /// Return a copy with the no-proxy list replaced.
    #[must_use]
    pub fn no_proxy_hosts<T: AsRef<str>>(mut self, exclusions: T) -> Proxy {
        self.no_proxy = NoProxy::from_string(exclusions.as_ref());
        self
    }
}

fn merge_headers(extra: &mut Extra, headers: HeaderMap) {
    match extra.misc {
        Some(ref mut existing) => existing.extend(headers),
        None => extra.misc = Some(headers),
    }
}
