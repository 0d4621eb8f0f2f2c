//! Connection wrapper shared by both transport adapters

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::proxy::EffectiveRoute;

/// Any bidirectional byte stream a request can be sent over.
///
/// Direct TCP, tunneled TCP and TLS over either all satisfy this, which lets
/// the adapters treat them interchangeably.
pub trait ConnectionTrait: AsyncRead + AsyncWrite + fmt::Debug + Send + Unpin {}

impl<T> ConnectionTrait for T where T: AsyncRead + AsyncWrite + fmt::Debug + Send + Unpin {}

/// An established connection to an origin, possibly through a tunnel.
pub struct Conn {
    inner: Box<dyn ConnectionTrait>,
    route: EffectiveRoute,
    alpn: Option<Vec<u8>>,
}

impl Conn {
    pub(crate) fn new<S: ConnectionTrait + 'static>(stream: S, route: EffectiveRoute) -> Self {
        Conn {
            inner: Box::new(stream),
            route,
            alpn: None,
        }
    }

    pub(crate) fn with_alpn(mut self, alpn: Option<Vec<u8>>) -> Self {
        self.alpn = alpn;
        self
    }

    /// Route this connection was opened on.
    #[must_use]
    pub fn route(&self) -> &EffectiveRoute {
        &self.route
    }

    /// Whether the bytes go through a proxy tunnel.
    #[must_use]
    pub fn is_proxied(&self) -> bool {
        self.route.is_proxied()
    }

    /// Protocol agreed during the TLS handshake, if any.
    #[must_use]
    pub fn negotiated_alpn(&self) -> Option<&[u8]> {
        self.alpn.as_deref()
    }
}

impl fmt::Debug for Conn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conn")
            .field("route", &self.route)
            .field("alpn", &self.alpn.as_deref().map(String::from_utf8_lossy))
            .finish_non_exhaustive()
    }
}

impl AsyncRead for Conn {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for Conn {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut *self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.inner).poll_shutdown(cx)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut *self.inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }
}
