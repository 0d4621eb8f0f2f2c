//! Request origins
//!
//! An [`Origin`] is the scheme/host/port triple naming the true destination
//! of a request, independent of any proxy used to reach it.

use std::fmt;

use http::Uri;

use crate::error::{self, BadScheme, Error};

/// Origin scheme. Decides whether TLS runs over the (possibly tunneled) stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    /// Default port for the scheme
    #[must_use]
    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    fn parse(scheme: &str) -> Option<Self> {
        if scheme.eq_ignore_ascii_case("https") {
            Some(Scheme::Https)
        } else if scheme.eq_ignore_ascii_case("http") {
            Some(Scheme::Http)
        } else {
            None
        }
    }
}

/// Destination of a request: `scheme://host:port`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    scheme: Scheme,
    host: String,
    port: u16,
}

impl Origin {
    /// Create an origin from its parts. IPv6 hosts may be given with or without brackets.
    #[must_use]
    pub fn new(scheme: Scheme, host: impl AsRef<str>, port: u16) -> Self {
        Self {
            scheme,
            host: normalize_host(host.as_ref()),
            port,
        }
    }

    /// Extract the origin of an absolute URL.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidConfiguration` error if the URL is not `http`/`https`
    /// or has no host.
    pub fn from_url(url: &url::Url) -> Result<Self, Error> {
        let scheme = Scheme::parse(url.scheme())
            .ok_or_else(|| error::configuration(BadScheme).with_url(url.clone()))?;
        let host = url.host_str().filter(|h| !h.is_empty()).ok_or_else(|| {
            error::configuration(format!("url has no host: {url}")).with_url(url.clone())
        })?;
        let port = url.port().unwrap_or_else(|| scheme.default_port());
        Ok(Self::new(scheme, host, port))
    }

    /// Extract the origin of an absolute URI.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidConfiguration` error if the URI is relative, not
    /// `http`/`https`, or has no host.
    pub fn from_uri(uri: &Uri) -> Result<Self, Error> {
        let scheme = uri
            .scheme_str()
            .and_then(Scheme::parse)
            .ok_or_else(|| error::configuration(BadScheme))?;
        let host = uri
            .host()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| error::configuration(format!("uri has no host: {uri}")))?;
        let port = uri.port_u16().unwrap_or_else(|| scheme.default_port());
        Ok(Self::new(scheme, host, port))
    }

    #[must_use]
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Host without IPv6 brackets, suitable for DNS and SNI.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether TLS must be negotiated with the origin.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.scheme == Scheme::Https
    }

    /// `host:port`, as used for the CONNECT request target and `Host` header.
    #[must_use]
    pub fn authority(&self) -> String {
        format_authority(&self.host, self.port)
    }

    /// Value for the HTTP/1.1 `Host` header: the port is omitted when it is
    /// the scheme default.
    #[must_use]
    pub fn host_header(&self) -> String {
        if self.port == self.scheme.default_port() {
            if self.host.contains(':') {
                format!("[{}]", self.host)
            } else {
                self.host.clone()
            }
        } else {
            self.authority()
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme.as_str(), self.authority())
    }
}

pub(crate) fn normalize_host(host: &str) -> String {
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .to_ascii_lowercase()
}

pub(crate) fn format_authority(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}
