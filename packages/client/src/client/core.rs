//! Client execution path: URL resolution, routing, transport dispatch

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderMap, USER_AGENT, HeaderValue};
use http::{Method, Request};

use super::builder::ClientBuilder;
use super::request::RequestBuilder;
use super::stats::{ClientStats, ClientStatsSnapshot};
use crate::config::HttpConfig;
use crate::error::{self, BadScheme, Error, TimedOut};
use crate::http::{HttpResponse, Origin};
use crate::protocols::{Http1Transport, Http2Transport, Transport};
use crate::proxy::{EffectiveRoute, Proxy, ProxyResolver};

/// Client speaking HTTP/1.1, one connection per request.
pub type Http1Client = Client<Http1Transport>;

/// Client speaking HTTP/2 over shared connections.
pub type Http2Client = Client<Http2Transport>;

/// A proxy-aware HTTP client.
///
/// Cloning is cheap and clones share connections and statistics.
///
/// ```no_run
/// use viaduct_client::{Http2Client, proxy::Proxy};
///
/// # async fn run() -> viaduct_client::Result<()> {
/// let client = Http2Client::builder()
///     .base_uri("https://localhost:8443")
///     .proxy(Proxy::http("proxy.internal", 3128)?)
///     .build()?;
///
/// let response = client.get("/get").request().await?;
/// println!("{}", response.text()?);
/// # Ok(())
/// # }
/// ```
pub struct Client<T: Transport> {
    inner: Arc<ClientRef<T>>,
}

pub(super) struct ClientRef<T> {
    pub(super) transport: T,
    pub(super) resolver: ProxyResolver,
    pub(super) proxy: Proxy,
    pub(super) base_uri: Option<url::Url>,
    pub(super) headers: HeaderMap,
    pub(super) config: HttpConfig,
    pub(super) stats: ClientStats,
}

impl<T: Transport> Client<T> {
    #[must_use]
    pub fn builder() -> ClientBuilder<T> {
        ClientBuilder::new()
    }

    pub(super) fn from_ref(inner: ClientRef<T>) -> Self {
        Client {
            inner: Arc::new(inner),
        }
    }

    /// Start a `GET` request. `target` is a path relative to the base URI or
    /// an absolute URL.
    pub fn get(&self, target: impl Into<String>) -> RequestBuilder<'_, T> {
        self.request(Method::GET, target)
    }

    pub fn post(&self, target: impl Into<String>) -> RequestBuilder<'_, T> {
        self.request(Method::POST, target)
    }

    pub fn put(&self, target: impl Into<String>) -> RequestBuilder<'_, T> {
        self.request(Method::PUT, target)
    }

    pub fn delete(&self, target: impl Into<String>) -> RequestBuilder<'_, T> {
        self.request(Method::DELETE, target)
    }

    pub fn request(&self, method: Method, target: impl Into<String>) -> RequestBuilder<'_, T> {
        RequestBuilder::new(self, method, target.into())
    }

    /// Default proxy descriptor.
    #[must_use]
    pub fn proxy(&self) -> &Proxy {
        &self.inner.proxy
    }

    /// Route a request to `origin` would take with the default descriptor.
    #[must_use]
    pub fn route_for(&self, origin: &Origin) -> EffectiveRoute {
        self.inner.resolver.resolve(&self.inner.proxy, origin)
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    #[must_use]
    pub fn config(&self) -> &HttpConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn stats(&self) -> ClientStatsSnapshot {
        self.inner.stats.snapshot()
    }

    pub(super) fn resolve_url(&self, target: &str) -> Result<url::Url, Error> {
        let mut url = match url::Url::parse(target) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.inner.base_uri {
                Some(base) => base.join(target).map_err(error::request)?,
                None => {
                    return Err(error::request(format!(
                        "relative target {target:?} needs a base uri"
                    )));
                }
            },
            Err(e) => return Err(error::request(e)),
        };
        url.set_fragment(None);

        if !matches!(url.scheme(), "http" | "https") {
            return Err(error::request(BadScheme).with_url(url));
        }
        Ok(url)
    }

    pub(super) async fn execute(
        &self,
        method: Method,
        target: &str,
        headers: HeaderMap,
        body: Bytes,
        proxy: Option<&Proxy>,
    ) -> Result<HttpResponse, Error> {
        let url = self.resolve_url(target)?;
        let origin = Origin::from_url(&url)?;
        let proxy = proxy.unwrap_or(&self.inner.proxy);
        let route = self.inner.resolver.resolve(proxy, &origin);

        tracing::debug!(
            target: "viaduct::client",
            method = %method,
            url = %url,
            route = %route,
            "sending request"
        );
        self.inner.stats.record_request(&route);

        let request = self
            .build_request(method, &url, headers, body)
            .map_err(|e| e.with_url(url.clone()))?;
        let send = self
            .inner
            .transport
            .execute(route, origin, proxy.extra().clone(), request);

        let result = match tokio::time::timeout(self.inner.config.timeout, send).await {
            Ok(result) => result,
            Err(_) => Err(error::timeout(TimedOut)),
        };

        match result {
            Ok(response) => {
                self.inner.stats.record_success(response.bytes().len());
                tracing::debug!(
                    target: "viaduct::client",
                    url = %url,
                    status = response.status().as_u16(),
                    "response received"
                );
                Ok(response)
            }
            Err(err) => {
                self.inner.stats.record_failure(&err);
                tracing::debug!(target: "viaduct::client", url = %url, error = %err, "request failed");
                Err(err.with_url(url))
            }
        }
    }

    fn build_request(
        &self,
        method: Method,
        url: &url::Url,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<Request<Bytes>, Error> {
        let mut request = Request::builder()
            .method(method)
            .uri(url.as_str())
            .body(body)
            .map_err(error::request)?;

        let merged = request.headers_mut();
        for (name, value) in &self.inner.headers {
            merged.insert(name.clone(), value.clone());
        }
        let mut last = None;
        for (name, value) in headers {
            // HeaderMap iteration yields the name only for the first value.
            if let Some(name) = name {
                merged.remove(&name);
                last = Some(name);
            }
            if let Some(name) = &last {
                merged.append(name.clone(), value);
            }
        }
        if !merged.contains_key(USER_AGENT) {
            let agent = HeaderValue::from_str(&self.inner.config.user_agent).map_err(error::request)?;
            merged.insert(USER_AGENT, agent);
        }
        Ok(request)
    }
}

impl<T: Transport> Clone for Client<T> {
    fn clone(&self) -> Self {
        Client {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("transport", &self.inner.transport)
            .field("proxy", &self.inner.proxy)
            .field("base_uri", &self.inner.base_uri.as_ref().map(url::Url::as_str))
            .finish_non_exhaustive()
    }
}
