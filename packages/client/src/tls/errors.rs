//! TLS-specific error types

use crate::error::{self, Error, TimedOut};

/// Errors from building a TLS configuration or running a handshake.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("Root certificate rejected: {0}")]
    InvalidRoot(#[source] rustls::Error),
    #[error("No trust anchors configured")]
    NoRoots,
    #[error("Certificate verifier could not be built: {0}")]
    Verifier(#[from] rustls::client::VerifierBuilderError),
    #[error("Protocol versions unsupported by provider: {0}")]
    Protocol(#[source] rustls::Error),
    #[error("Invalid server name {0:?}")]
    InvalidServerName(String),
    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] std::io::Error),
    #[error("TLS handshake timed out")]
    Timeout(#[source] TimedOut),
}

impl From<TlsError> for Error {
    fn from(err: TlsError) -> Self {
        match err {
            TlsError::InvalidRoot(_)
            | TlsError::NoRoots
            | TlsError::Verifier(_)
            | TlsError::Protocol(_) => error::configuration(err),
            TlsError::InvalidServerName(_) | TlsError::Handshake(_) | TlsError::Timeout(_) => {
                error::tls(err)
            }
        }
    }
}
