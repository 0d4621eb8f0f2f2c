//! Client construction

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use http::HeaderMap;
use http::header::{HeaderName, HeaderValue};

use super::core::{Client, ClientRef};
use super::stats::ClientStats;
use crate::config::{HttpConfig, Validator};
use crate::connect::Connector;
use crate::error::{self, Error};
use crate::http::Origin;
use crate::protocols::Transport;
use crate::proxy::{NoSystemProxy, Proxy, ProxyResolver, SystemProxySource};
use crate::tls::TlsConfig;

/// Builder for [`Client`].
///
/// Everything is validated in [`ClientBuilder::build`], so a client that was
/// built never fails a request because of its own configuration.
pub struct ClientBuilder<T> {
    config: HttpConfig,
    tls: TlsConfig,
    proxy: Proxy,
    system: Arc<dyn SystemProxySource>,
    base_uri: Option<String>,
    headers: HeaderMap,
    error: Option<Error>,
    _transport: PhantomData<fn() -> T>,
}

impl<T: Transport> Default for ClientBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> ClientBuilder<T> {
    #[must_use]
    pub fn new() -> Self {
        ClientBuilder {
            config: HttpConfig::default(),
            tls: TlsConfig::default(),
            proxy: Proxy::no_proxy(),
            system: Arc::new(NoSystemProxy),
            base_uri: None,
            headers: HeaderMap::new(),
            error: None,
            _transport: PhantomData,
        }
    }

    /// Resolve relative request paths against `uri`.
    #[must_use]
    pub fn base_uri(mut self, uri: impl Into<String>) -> Self {
        self.base_uri = Some(uri.into());
        self
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: HttpConfig) -> Self {
        self.config = config;
        self
    }

    /// Per-request deadline, covering connect, tunnel, TLS and body.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn tls(mut self, tls: TlsConfig) -> Self {
        self.tls = tls;
        self
    }

    /// Descriptor used by requests that do not set their own.
    #[must_use]
    pub fn proxy(mut self, proxy: Proxy) -> Self {
        self.proxy = proxy;
        self
    }

    /// Ambient proxy configuration consulted by [`Proxy::system`] descriptors.
    #[must_use]
    pub fn system_proxy_source(mut self, source: impl SystemProxySource + 'static) -> Self {
        self.system = Arc::new(source);
        self
    }

    /// Header sent with every request unless the request sets it too.
    #[must_use]
    pub fn default_header<K, V>(mut self, name: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        if self.error.is_none() {
            match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
                (Ok(name), Ok(value)) => {
                    self.headers.insert(name, value);
                }
                (Err(e), _) => self.error = Some(error::configuration(Into::<http::Error>::into(e))),
                (_, Err(e)) => self.error = Some(error::configuration(Into::<http::Error>::into(e))),
            }
        }
        self
    }

    /// Validate everything and build the client.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidConfiguration` error if a header, the base URI,
    /// a configuration value or the TLS settings are invalid.
    pub fn build(self) -> Result<Client<T>, Error> {
        if let Some(err) = self.error {
            return Err(err);
        }
        self.config.validate()?;

        let base_uri = match self.base_uri {
            Some(raw) => {
                let url = url::Url::parse(&raw).map_err(error::configuration)?;
                Origin::from_url(&url)?;
                Some(url)
            }
            None => None,
        };

        let connector = Connector::new(self.config.clone(), &self.tls, T::ALPN)?;

        tracing::debug!(
            target: "viaduct::client",
            alpn = %String::from_utf8_lossy(T::ALPN),
            proxy = ?self.proxy,
            "client built"
        );

        Ok(Client::from_ref(ClientRef {
            transport: T::new(connector),
            resolver: ProxyResolver::new(self.system),
            proxy: self.proxy,
            base_uri,
            headers: self.headers,
            config: self.config,
            stats: ClientStats::new(),
        }))
    }
}

impl<T> fmt::Debug for ClientBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .field("tls", &self.tls)
            .field("proxy", &self.proxy)
            .field("system", &self.system)
            .field("base_uri", &self.base_uri)
            .finish_non_exhaustive()
    }
}
