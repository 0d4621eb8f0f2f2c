use std::sync::Arc;
use std::time::Duration;

use rustls::ClientConfig;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use super::errors::TlsError;
use crate::error::TimedOut;
use crate::http::Origin;

/// Run a client handshake with `origin` over `stream`.
///
/// `stream` may be a raw socket or a CONNECT tunnel, the handshake is the
/// same either way.
pub(crate) async fn handshake<S>(
    config: Arc<ClientConfig>,
    origin: &Origin,
    stream: S,
    timeout: Duration,
) -> Result<TlsStream<S>, TlsError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let server_name = ServerName::try_from(origin.host().to_owned())
        .map_err(|_| TlsError::InvalidServerName(origin.host().to_owned()))?;

    let connect = TlsConnector::from(config).connect(server_name, stream);
    let tls = tokio::time::timeout(timeout, connect)
        .await
        .map_err(|_| TlsError::Timeout(TimedOut))?
        .map_err(TlsError::Handshake)?;

    tracing::trace!(
        target: "viaduct::tls",
        origin = %origin,
        alpn = ?tls.get_ref().1.alpn_protocol().map(String::from_utf8_lossy),
        "tls handshake complete"
    );
    Ok(tls)
}
