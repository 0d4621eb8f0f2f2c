//! Core proxy types and structures

use std::fmt;

use http::{HeaderMap, header::HeaderValue};

use super::no_proxy::NoProxy;

/// Port used when a descriptor names a proxy host without a port.
pub const DEFAULT_PROXY_PORT: u16 = 80;

/// Type tag of a proxy descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyType {
    /// No proxy.
    ///
    /// A descriptor tagged `None` that still carries a host is routed through
    /// that host: host/port presence wins over the tag. This mirrors observed
    /// behavior of earlier clients and is likely a historical accident rather
    /// than a designed rule; it may be revisited.
    None,
    /// An explicit HTTP proxy reached with CONNECT. Requires a host.
    Http,
    /// Derive the proxy from the ambient [`SystemProxySource`](crate::proxy::SystemProxySource).
    System,
}

/// Immutable description of one proxy configuration.
///
/// Construct with [`Proxy::no_proxy`], [`Proxy::system`], [`Proxy::http`] or
/// [`Proxy::builder`]. Invalid combinations are rejected when the descriptor
/// is built, never when a request is sent.
///
/// ```
/// use viaduct_client::proxy::{Proxy, ProxyType};
///
/// let proxy = Proxy::builder()
///     .kind(ProxyType::Http)
///     .host("proxy.internal")
///     .port(3128)
///     .build()?;
/// assert_eq!(proxy.host(), Some("proxy.internal"));
/// # Ok::<(), viaduct_client::Error>(())
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Proxy {
    pub(crate) kind: Option<ProxyType>,
    pub(crate) host: Option<String>,
    pub(crate) port: Option<u16>,
    pub(crate) no_proxy: Option<NoProxy>,
    pub(crate) extra: Extra,
}

/// Builder for [`Proxy`]. Every field is optional until [`ProxyBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct ProxyBuilder {
    pub(crate) kind: Option<ProxyType>,
    pub(crate) host: Option<String>,
    pub(crate) port: Option<u16>,
    pub(crate) no_proxy: Option<NoProxy>,
    pub(crate) extra: Extra,
}

/// Headers sent to the proxy with the CONNECT request.
///
/// This is the authentication extension point: the client forwards the
/// configured `Proxy-Authorization` value verbatim and implements no scheme
/// of its own.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Extra {
    pub(crate) auth: Option<HeaderValue>,
    pub(crate) misc: Option<HeaderMap>,
}

impl Extra {
    /// `Proxy-Authorization` value, if any
    #[must_use]
    pub fn auth(&self) -> Option<&HeaderValue> {
        self.auth.as_ref()
    }

    /// Extra CONNECT headers, if any
    #[must_use]
    pub fn headers(&self) -> Option<&HeaderMap> {
        self.misc.as_ref()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.auth.is_none() && self.misc.as_ref().is_none_or(HeaderMap::is_empty)
    }

    /// Canonical bytes identifying what this sends to the proxy.
    ///
    /// Equal fingerprints mean equal CONNECT headers regardless of insertion
    /// order. Every field is length-prefixed.
    pub(crate) fn fingerprint(&self) -> Vec<u8> {
        fn push(out: &mut Vec<u8>, field: &[u8]) {
            out.extend_from_slice(&field.len().to_be_bytes());
            out.extend_from_slice(field);
        }

        let mut out = Vec::new();
        if let Some(auth) = &self.auth {
            out.push(1);
            push(&mut out, auth.as_bytes());
        } else {
            out.push(0);
        }

        let mut pairs: Vec<(&[u8], &[u8])> = self
            .misc
            .iter()
            .flatten()
            .map(|(name, value)| (name.as_str().as_bytes(), value.as_bytes()))
            .collect();
        pairs.sort_unstable();
        for (name, value) in pairs {
            push(&mut out, name);
            push(&mut out, value);
        }
        out
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("kind", &self.kind)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("no_proxy", &self.no_proxy)
            .field("extra", &self.extra)
            .finish()
    }
}

impl fmt::Debug for Extra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extra")
            .field("auth", &self.auth.is_some())
            .field("misc", &self.misc.as_ref().map(HeaderMap::len))
            .finish()
    }
}
