//! CONNECT negotiation failures

use bytes::Bytes;
use http::StatusCode;

use crate::error::{Error, Kind, TimedOut};

/// Why a CONNECT exchange did not produce a tunnel.
#[derive(Debug, thiserror::Error)]
pub enum NegotiationError {
    /// The proxy answered with a non-2xx status.
    #[error("proxy rejected CONNECT with status {status}")]
    Rejected {
        /// Status line code
        status: StatusCode,
        /// Response body, drained up to the configured limit
        body: Bytes,
    },
    /// The response head could not be parsed.
    #[error("malformed CONNECT response: {0}")]
    Malformed(String),
    /// The proxy closed the connection before the response head was complete.
    #[error("proxy closed the connection during CONNECT")]
    UnexpectedEof,
    /// The response head grew beyond the configured limit.
    #[error("CONNECT response head exceeds {limit} bytes")]
    HeadTooLarge {
        /// Configured limit
        limit: usize,
    },
    /// The proxy did not answer within the tunnel timeout.
    #[error("CONNECT response not received in time")]
    Timeout(#[source] TimedOut),
    /// Reading from or writing to the proxy failed.
    #[error("io error during CONNECT")]
    Io(#[from] std::io::Error),
}

impl NegotiationError {
    /// Body of a rejected response, if any.
    #[must_use]
    pub fn body(&self) -> Option<&Bytes> {
        match self {
            NegotiationError::Rejected { body, .. } => Some(body),
            _ => None,
        }
    }
}

impl From<NegotiationError> for Error {
    fn from(err: NegotiationError) -> Self {
        let kind = match &err {
            NegotiationError::Rejected { status, .. } => Kind::TunnelRejected { status: *status },
            NegotiationError::Io(_) => Kind::Connect,
            NegotiationError::Malformed(_)
            | NegotiationError::UnexpectedEof
            | NegotiationError::HeadTooLarge { .. }
            | NegotiationError::Timeout(_) => Kind::ProtocolViolation,
        };
        Error::new(kind).with(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_onto_public_error() {
        let err: Error = NegotiationError::Rejected {
            status: StatusCode::FORBIDDEN,
            body: Bytes::from_static(b"nope"),
        }
        .into();
        assert!(err.is_tunnel_rejected());
        assert_eq!(err.tunnel_status(), Some(StatusCode::FORBIDDEN));

        let err: Error = NegotiationError::UnexpectedEof.into();
        assert!(err.is_protocol_violation());

        let err: Error = NegotiationError::Timeout(TimedOut).into();
        assert!(err.is_protocol_violation());
        assert!(err.is_timeout());

        let err: Error = NegotiationError::Io(std::io::ErrorKind::BrokenPipe.into()).into();
        assert!(err.is_connect());
    }
}
