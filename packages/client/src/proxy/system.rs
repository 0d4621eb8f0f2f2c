//! Ambient proxy configuration
//!
//! [`SystemProxySource`] is the seam between the resolver and whatever the
//! embedding application treats as the process-wide proxy setting.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use super::core::{DEFAULT_PROXY_PORT, NoProxy};
use super::resolver::ProxyAddress;
use crate::http::{Origin, Scheme};

/// Queryable ambient proxy configuration.
///
/// Implementations are read on every resolution and must not cache a value
/// across calls.
pub trait SystemProxySource: Send + Sync + fmt::Debug {
    /// Proxy to use for `origin`, or `None` to connect directly.
    fn proxy_for(&self, origin: &Origin) -> Option<ProxyAddress>;
}

impl<T: SystemProxySource + ?Sized> SystemProxySource for Arc<T> {
    fn proxy_for(&self, origin: &Origin) -> Option<ProxyAddress> {
        (**self).proxy_for(origin)
    }
}

/// A system source that never proxies.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSystemProxy;

impl SystemProxySource for NoSystemProxy {
    fn proxy_for(&self, _origin: &Origin) -> Option<ProxyAddress> {
        None
    }
}

/// A swappable proxy registry shared between an application and its clients.
///
/// Clones share the same slot. Updating it changes the route of the next
/// request from every client that was built with it.
///
/// ```
/// use viaduct_client::proxy::{ProxyAddress, ProxySelector};
///
/// let selector = ProxySelector::new();
/// selector.set(ProxyAddress::new("proxy.internal", 3128));
/// assert_eq!(selector.current().unwrap().port(), 3128);
/// selector.clear();
/// assert!(selector.current().is_none());
/// ```
#[derive(Clone, Default)]
pub struct ProxySelector {
    slot: Arc<RwLock<Option<ProxyAddress>>>,
}

impl ProxySelector {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry initially pointing at `addr`.
    #[must_use]
    pub fn of(addr: ProxyAddress) -> Self {
        let selector = Self::new();
        selector.set(addr);
        selector
    }

    /// Route subsequent requests through `addr`.
    pub fn set(&self, addr: ProxyAddress) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(addr);
    }

    /// Route subsequent requests directly.
    pub fn clear(&self) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Current value.
    #[must_use]
    pub fn current(&self) -> Option<ProxyAddress> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl SystemProxySource for ProxySelector {
    fn proxy_for(&self, _origin: &Origin) -> Option<ProxyAddress> {
        self.current()
    }
}

impl fmt::Debug for ProxySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProxySelector").field(&self.current()).finish()
    }
}

/// Proxy settings from the conventional environment variables.
///
/// `https` origins use `HTTPS_PROXY`, `http` origins use `HTTP_PROXY`, both
/// falling back to `ALL_PROXY`. Lowercase spellings are accepted. Hosts on
/// `NO_PROXY` connect directly. The environment is read on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvProxySource;

impl EnvProxySource {
    fn var(names: &[&str]) -> Option<String> {
        names
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .map(|v| v.trim().to_owned())
            .find(|v| !v.is_empty())
    }
}

impl SystemProxySource for EnvProxySource {
    fn proxy_for(&self, origin: &Origin) -> Option<ProxyAddress> {
        if NoProxy::from_env().is_some_and(|np| np.matches(origin.host())) {
            return None;
        }

        let raw = match origin.scheme() {
            Scheme::Https => Self::var(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"]),
            Scheme::Http => Self::var(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]),
        }?;

        let parsed = parse_proxy_url(&raw);
        if parsed.is_none() {
            tracing::warn!(target: "viaduct::proxy", value = %raw, "ignoring unusable proxy environment value");
        }
        parsed
    }
}

/// Parse `http://host:port`, or a bare `host:port`, into an address.
///
/// Only `http` proxies are understood. Credentials in the URL are ignored.
fn parse_proxy_url(raw: &str) -> Option<ProxyAddress> {
    let with_scheme = if raw.contains("://") {
        raw.to_owned()
    } else {
        format!("http://{raw}")
    };

    let url = url::Url::parse(&with_scheme).ok()?;
    if url.scheme() != "http" {
        return None;
    }
    let host = url.host_str()?;
    Some(ProxyAddress::new(host, url.port().unwrap_or(DEFAULT_PROXY_PORT)))
}
