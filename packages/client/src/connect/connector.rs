//! Route-aware connection establishment shared by both transport adapters

use std::sync::Arc;

use rustls::ClientConfig;

use super::conn::{Conn, ConnectionTrait};
use super::tcp;
use super::tunnel::TunnelNegotiator;
use crate::config::HttpConfig;
use crate::error::Error;
use crate::http::Origin;
use crate::proxy::{EffectiveRoute, Extra};
use crate::tls::{self, TlsConfig};

/// Opens connections to origins, directly or through a CONNECT tunnel.
///
/// There is no fallback between routes: a failed tunnel fails the
/// connection, it never turns into a direct attempt.
#[derive(Clone, Debug)]
pub struct Connector {
    config: HttpConfig,
    tls: Arc<ClientConfig>,
}

impl Connector {
    /// Connector advertising `alpn` to `https` origins.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidConfiguration` error if the TLS settings cannot be
    /// turned into a rustls config.
    pub fn new(config: HttpConfig, tls: &TlsConfig, alpn: &[u8]) -> Result<Self, Error> {
        let tls = tls.client_config(&[alpn])?;
        Ok(Connector { config, tls })
    }

    /// Settings this connector was built with.
    #[must_use]
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Open an application stream to `origin` over `route`.
    ///
    /// For a proxied route the TCP connection goes to the proxy, a CONNECT
    /// tunnel to `origin` is negotiated with `extra` headers, and the result
    /// is handled exactly like a direct socket. `https` origins get a TLS
    /// handshake over whichever stream came out.
    ///
    /// # Errors
    ///
    /// - `Connect` if the proxy or origin cannot be reached
    /// - `TunnelRejected` or `ProtocolViolation` if the CONNECT exchange fails
    /// - `Tls` if the handshake fails
    pub async fn open_connection(
        &self,
        route: &EffectiveRoute,
        origin: &Origin,
        extra: &Extra,
    ) -> Result<Conn, Error> {
        match route {
            EffectiveRoute::Direct => {
                let tcp = tcp::connect(
                    origin.host(),
                    origin.port(),
                    self.config.connect_timeout,
                    self.config.tcp_nodelay,
                )
                .await?;
                self.finish(tcp, route, origin).await
            }
            EffectiveRoute::ViaProxy { host, port } => {
                let tcp = tcp::connect(
                    host,
                    *port,
                    self.config.connect_timeout,
                    self.config.tcp_nodelay,
                )
                .await?;

                let negotiator = if extra.is_empty() {
                    TunnelNegotiator::new(&self.config)
                } else {
                    TunnelNegotiator::new(&self.config).with_extra(extra)
                };
                let tunneled = negotiator.negotiate(tcp, origin).await?;
                self.finish(tunneled, route, origin).await
            }
        }
    }

    async fn finish<S>(&self, stream: S, route: &EffectiveRoute, origin: &Origin) -> Result<Conn, Error>
    where
        S: ConnectionTrait + 'static,
    {
        let conn = if origin.is_secure() {
            let tls = tls::handshake(
                self.tls.clone(),
                origin,
                stream,
                self.config.tls_handshake_timeout,
            )
            .await?;
            let alpn = tls.get_ref().1.alpn_protocol().map(<[u8]>::to_vec);
            Conn::new(tls, route.clone()).with_alpn(alpn)
        } else {
            Conn::new(stream, route.clone())
        };

        tracing::debug!(
            target: "viaduct::connect",
            origin = %origin,
            route = %route,
            "connection established"
        );
        Ok(conn)
    }
}
