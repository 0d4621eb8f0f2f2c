//! Transport adapters
//!
//! Both adapters get their byte stream from the same
//! [`Connector`](crate::connect::Connector), so direct and tunneled
//! connections look identical to them.

use std::fmt;
use std::future::Future;

use bytes::Bytes;
use http::Request;

use crate::connect::Connector;
use crate::error::Error;
use crate::http::{HttpResponse, Origin};
use crate::proxy::{EffectiveRoute, Extra};

pub mod h2;
pub mod http1;

pub use h2::Http2Transport;
pub use http1::Http1Transport;

/// An application protocol spoken over a connection from a [`Connector`].
pub trait Transport: fmt::Debug + Send + Sync + 'static {
    /// ALPN identifier offered during the TLS handshake.
    const ALPN: &'static [u8];

    /// Adapter that opens its connections through `connector`.
    fn new(connector: Connector) -> Self
    where
        Self: Sized;

    /// Connector used by this adapter.
    fn connector(&self) -> &Connector;

    /// Send `request` to `origin` over `route` and collect the response.
    ///
    /// The request URI is absolute. `extra` carries the CONNECT headers of
    /// the proxy descriptor the route came from.
    fn execute(
        &self,
        route: EffectiveRoute,
        origin: Origin,
        extra: Extra,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<HttpResponse, Error>> + Send;
}
