use super::types::{Error, Kind};

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Creates an `Error` for a bad descriptor or configuration value.
pub(crate) fn configuration<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::InvalidConfiguration).with(e.into())
}

/// Creates an `Error` for a failed transport-layer connection.
pub(crate) fn connect<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Connect).with(e.into())
}

/// Creates an `Error` for a peer that broke the expected protocol.
pub(crate) fn protocol_violation<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::ProtocolViolation).with(e.into())
}

/// Creates an `Error` for a failed TLS handshake.
pub(crate) fn tls<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Tls).with(e.into())
}

/// Creates an `Error` for a failed request exchange.
pub(crate) fn request<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Request).with(e.into())
}

/// Creates an `Error` for a body error.
pub(crate) fn body<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Body).with(e.into())
}

/// Creates an `Error` for a decode error.
pub(crate) fn decode<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Decode).with(e.into())
}

/// Creates an `Error` for an elapsed request timeout.
pub(crate) fn timeout<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Timeout).with(e.into())
}
