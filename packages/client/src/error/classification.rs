use std::error::Error as StdError;
use std::io;

use http::StatusCode;

use super::helpers::TimedOut;
use super::types::{Error, Kind};

impl Error {
    /// Returns true if the error comes from a bad descriptor or configuration.
    #[must_use]
    pub fn is_invalid_configuration(&self) -> bool {
        matches!(self.inner.kind, Kind::InvalidConfiguration)
    }

    /// Returns true if the transport connection to the proxy or origin failed.
    #[must_use]
    pub fn is_connect(&self) -> bool {
        matches!(self.inner.kind, Kind::Connect)
    }

    /// Returns true if the proxy refused the CONNECT tunnel.
    #[must_use]
    pub fn is_tunnel_rejected(&self) -> bool {
        matches!(self.inner.kind, Kind::TunnelRejected { .. })
    }

    /// Returns true if the proxy broke the CONNECT exchange.
    #[must_use]
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self.inner.kind, Kind::ProtocolViolation)
    }

    /// Returns true if the TLS handshake failed.
    #[must_use]
    pub fn is_tls(&self) -> bool {
        matches!(self.inner.kind, Kind::Tls)
    }

    /// Returns true if the error is related to the request exchange
    #[must_use]
    pub fn is_request(&self) -> bool {
        matches!(self.inner.kind, Kind::Request)
    }

    /// Returns true if the error is related to the response body
    #[must_use]
    pub fn is_body(&self) -> bool {
        matches!(self.inner.kind, Kind::Body)
    }

    /// Returns true if the error is related to decoding the response's body
    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(self.inner.kind, Kind::Decode)
    }

    /// Returns true if the error is related to a timeout, at any layer.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        if matches!(self.inner.kind, Kind::Timeout) {
            return true;
        }

        let mut source = self.source();

        while let Some(err) = source {
            if err.is::<TimedOut>() {
                return true;
            }
            if let Some(io) = err.downcast_ref::<io::Error>()
                && io.kind() == io::ErrorKind::TimedOut
            {
                return true;
            }
            source = err.source();
        }

        false
    }

    /// Returns the status the proxy answered the CONNECT request with, if it was rejected.
    #[must_use]
    pub fn tunnel_status(&self) -> Option<StatusCode> {
        match self.inner.kind {
            Kind::TunnelRejected { status } => Some(status),
            _ => None,
        }
    }
}
