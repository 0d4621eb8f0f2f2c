//! Per-request route resolution
//!
//! [`ProxyResolver::resolve`] is a pure function of the descriptor, the
//! origin and one read of the system proxy source. Nothing is cached, so a
//! change to the ambient registry is visible on the very next call.

use std::fmt;
use std::sync::Arc;

use super::core::{DEFAULT_PROXY_PORT, Proxy, ProxyType};
use super::system::{NoSystemProxy, SystemProxySource};
use crate::http::Origin;
use crate::http::origin::format_authority;

/// Address of a forward proxy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyAddress {
    host: String,
    port: u16,
}

impl ProxyAddress {
    /// Create an address. IPv6 brackets are stripped and the host lowercased.
    #[must_use]
    pub fn new(host: impl AsRef<str>, port: u16) -> Self {
        ProxyAddress {
            host: crate::http::origin::normalize_host(host.as_ref()),
            port,
        }
    }

    /// Proxy host
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Proxy port
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for ProxyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_authority(&self.host, self.port))
    }
}

/// Where the bytes of one request actually go.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EffectiveRoute {
    /// Straight to the origin.
    Direct,
    /// Through a CONNECT tunnel opened on this proxy.
    ViaProxy {
        /// Proxy host
        host: String,
        /// Proxy port
        port: u16,
    },
}

impl EffectiveRoute {
    /// Whether the route goes through a proxy.
    #[must_use]
    pub fn is_proxied(&self) -> bool {
        matches!(self, EffectiveRoute::ViaProxy { .. })
    }
}

impl From<ProxyAddress> for EffectiveRoute {
    fn from(addr: ProxyAddress) -> Self {
        EffectiveRoute::ViaProxy {
            host: addr.host,
            port: addr.port,
        }
    }
}

impl fmt::Display for EffectiveRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectiveRoute::Direct => f.write_str("direct"),
            EffectiveRoute::ViaProxy { host, port } => {
                write!(f, "via {}", format_authority(host, *port))
            }
        }
    }
}

/// Turns a [`Proxy`] descriptor into an [`EffectiveRoute`] for an origin.
///
/// The system source is injected so tests and embedders control the ambient
/// configuration without touching process state.
#[derive(Clone)]
pub struct ProxyResolver {
    system: Arc<dyn SystemProxySource>,
}

impl ProxyResolver {
    /// Resolver backed by `system` for [`ProxyType::System`] descriptors.
    pub fn new(system: Arc<dyn SystemProxySource>) -> Self {
        ProxyResolver { system }
    }

    /// The system source this resolver consults.
    #[must_use]
    pub fn system_source(&self) -> &Arc<dyn SystemProxySource> {
        &self.system
    }

    /// Resolve the route for `origin` under `proxy`.
    ///
    /// First match wins:
    /// 1. `System`: ask the system source, `Direct` if it has nothing.
    /// 2. A host is present (type unset, `None` or `Http`): via that host,
    ///    port defaulting to [`DEFAULT_PROXY_PORT`].
    /// 3. Otherwise `Direct`.
    ///
    /// A proxied route whose origin host is on the descriptor's no-proxy
    /// list becomes `Direct`.
    pub fn resolve(&self, proxy: &Proxy, origin: &Origin) -> EffectiveRoute {
        let route = match (proxy.kind(), proxy.host()) {
            (Some(ProxyType::System), _) => self
                .system
                .proxy_for(origin)
                .map_or(EffectiveRoute::Direct, EffectiveRoute::from),
            (_, Some(host)) => EffectiveRoute::ViaProxy {
                host: host.to_owned(),
                port: proxy.port().unwrap_or(DEFAULT_PROXY_PORT),
            },
            (_, None) => EffectiveRoute::Direct,
        };

        if route.is_proxied() && proxy.no_proxy_list().is_some_and(|np| np.matches(origin.host())) {
            tracing::debug!(
                target: "viaduct::proxy",
                origin = %origin,
                "origin is on the no-proxy list, bypassing proxy"
            );
            return EffectiveRoute::Direct;
        }

        tracing::trace!(target: "viaduct::proxy", origin = %origin, route = %route, "resolved route");
        route
    }
}

impl Default for ProxyResolver {
    fn default() -> Self {
        ProxyResolver::new(Arc::new(NoSystemProxy))
    }
}

impl fmt::Debug for ProxyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyResolver")
            .field("system", &self.system)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Scheme;
    use crate::proxy::ProxySelector;

    fn origin() -> Origin {
        Origin::new(Scheme::Https, "localhost", 8443)
    }

    fn via(host: &str, port: u16) -> EffectiveRoute {
        EffectiveRoute::ViaProxy {
            host: host.to_owned(),
            port,
        }
    }

    #[test]
    fn none_without_host_is_direct() {
        let resolver = ProxyResolver::default();
        assert_eq!(resolver.resolve(&Proxy::no_proxy(), &origin()), EffectiveRoute::Direct);
    }

    #[test]
    fn unset_kind_with_host_is_proxied() {
        let resolver = ProxyResolver::default();
        let proxy = Proxy::builder().host("proxy").port(3128).build().unwrap();
        assert_eq!(resolver.resolve(&proxy, &origin()), via("proxy", 3128));
    }

    #[test]
    fn none_kind_with_host_is_still_proxied() {
        let resolver = ProxyResolver::default();
        let proxy = Proxy::builder()
            .kind(ProxyType::None)
            .host("proxy")
            .port(3128)
            .build()
            .unwrap();
        assert_eq!(resolver.resolve(&proxy, &origin()), via("proxy", 3128));
    }

    #[test]
    fn explicit_http_is_proxied() {
        let resolver = ProxyResolver::default();
        let proxy = Proxy::http("proxy", 3128).unwrap();
        assert_eq!(resolver.resolve(&proxy, &origin()), via("proxy", 3128));
    }

    #[test]
    fn missing_port_defaults() {
        let resolver = ProxyResolver::default();
        let proxy = Proxy::builder().host("proxy").build().unwrap();
        assert_eq!(resolver.resolve(&proxy, &origin()), via("proxy", DEFAULT_PROXY_PORT));
    }

    #[test]
    fn unset_kind_without_host_is_direct() {
        let resolver = ProxyResolver::default();
        let proxy = Proxy::builder().port(3128).build().unwrap();
        assert_eq!(resolver.resolve(&proxy, &origin()), EffectiveRoute::Direct);
    }

    #[test]
    fn system_follows_the_registry_between_calls() {
        let selector = ProxySelector::new();
        let resolver = ProxyResolver::new(Arc::new(selector.clone()));
        let proxy = Proxy::system();

        assert_eq!(resolver.resolve(&proxy, &origin()), EffectiveRoute::Direct);

        selector.set(ProxyAddress::new("proxy", 3128));
        assert_eq!(resolver.resolve(&proxy, &origin()), via("proxy", 3128));

        selector.clear();
        assert_eq!(resolver.resolve(&proxy, &origin()), EffectiveRoute::Direct);
    }

    #[test]
    fn system_ignores_descriptor_host() {
        let resolver = ProxyResolver::default();
        let proxy = Proxy::builder()
            .kind(ProxyType::System)
            .host("ignored")
            .build()
            .unwrap();
        assert_eq!(resolver.resolve(&proxy, &origin()), EffectiveRoute::Direct);
    }

    #[test]
    fn no_proxy_list_bypasses() {
        let resolver = ProxyResolver::default();
        let proxy = Proxy::http("proxy", 3128)
            .unwrap()
            .no_proxy_hosts("localhost");
        assert_eq!(resolver.resolve(&proxy, &origin()), EffectiveRoute::Direct);

        let other = Origin::new(Scheme::Https, "example.com", 443);
        assert_eq!(resolver.resolve(&proxy, &other), via("proxy", 3128));
    }

    #[test]
    fn route_display() {
        assert_eq!(EffectiveRoute::Direct.to_string(), "direct");
        assert_eq!(via("::1", 8080).to_string(), "via [::1]:8080");
    }
}
