use std::error::Error as StdError;
use std::fmt;

use http::StatusCode;

/// A Result alias where the Err case is `viaduct_client::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents errors that can occur while routing, tunneling and sending requests.
pub struct Error {
    pub(crate) inner: Box<Inner>,
}

pub(crate) struct Inner {
    pub(crate) kind: Kind,
    pub(crate) source: Option<Box<dyn StdError + Send + Sync>>,
    pub(crate) url: Option<url::Url>,
}

/// The structured kind of an [`Error`].
///
/// Retry policy, if any, belongs to the caller and is expected to be
/// decided on this value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Kind {
    /// Bad proxy descriptor or client configuration, reported at construction time.
    InvalidConfiguration,
    /// Transport-layer connection to the proxy or the origin could not be established.
    Connect,
    /// The proxy answered the CONNECT request with a non-2xx status.
    TunnelRejected {
        /// Status returned by the proxy.
        status: StatusCode,
    },
    /// The proxy sent a malformed CONNECT response, closed early or timed out.
    ProtocolViolation,
    /// TLS handshake failed over a direct or tunneled stream.
    Tls,
    /// The application-layer exchange failed after the connection was established.
    Request,
    /// Reading the response body failed.
    Body,
    /// The response body could not be decoded as requested.
    Decode,
    /// The request did not complete within the configured request timeout.
    Timeout,
}

impl Error {
    pub(crate) fn new(kind: Kind) -> Error {
        Error {
            inner: Box::new(Inner {
                kind,
                source: None,
                url: None,
            }),
        }
    }

    #[must_use = "Error builder methods return a new Error and should be used"]
    pub(crate) fn with<E: Into<Box<dyn StdError + Send + Sync>>>(mut self, source: E) -> Error {
        self.inner.source = Some(source.into());
        self
    }

    #[must_use]
    pub(crate) fn with_url(mut self, url: url::Url) -> Self {
        self.inner.url = Some(url);
        self
    }

    /// Returns the structured kind of this error.
    #[must_use]
    pub fn kind(&self) -> &Kind {
        &self.inner.kind
    }

    /// Get the URL associated with this error, if any
    #[must_use]
    pub fn url(&self) -> Option<&url::Url> {
        self.inner.url.as_ref()
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_struct("viaduct_client::Error");

        f.field("kind", &self.inner.kind);

        if let Some(ref source) = self.inner.source {
            f.field("source", source);
        }

        if let Some(ref url) = self.inner.url {
            f.field("url", url);
        }

        f.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner.kind {
            Kind::InvalidConfiguration => f.write_str("invalid configuration")?,
            Kind::Connect => f.write_str("error establishing connection")?,
            Kind::TunnelRejected { status } => write!(f, "proxy rejected CONNECT tunnel ({status})")?,
            Kind::ProtocolViolation => f.write_str("malformed CONNECT response from proxy")?,
            Kind::Tls => f.write_str("tls handshake error")?,
            Kind::Request => f.write_str("error sending request")?,
            Kind::Body => f.write_str("response body error")?,
            Kind::Decode => f.write_str("error decoding response body")?,
            Kind::Timeout => f.write_str("request timeout")?,
        }

        if let Some(url) = &self.inner.url {
            write!(f, " for url ({url})")?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner
            .source
            .as_ref()
            .map(|err| &**err as &(dyn StdError + 'static))
    }
}
