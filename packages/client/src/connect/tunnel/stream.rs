use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes};
use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

pin_project! {
    /// An established tunnel.
    ///
    /// Bytes the proxy sent after its CONNECT response head are yielded
    /// first, then reads go straight to the underlying stream. Writes are
    /// never intercepted.
    pub struct Tunneled<S> {
        prefix: Bytes,
        #[pin]
        inner: S,
    }
}

impl<S> Tunneled<S> {
    pub(crate) fn new(inner: S, prefix: Bytes) -> Self {
        Tunneled { prefix, inner }
    }

    /// Bytes still waiting to be read before the underlying stream.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.prefix.len()
    }

    /// Underlying stream. Any buffered bytes are lost.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: fmt::Debug> fmt::Debug for Tunneled<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tunneled")
            .field("buffered", &self.prefix.len())
            .field("inner", &self.inner)
            .finish()
    }
}

impl<S: AsyncRead> AsyncRead for Tunneled<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.project();
        if !this.prefix.is_empty() {
            let n = this.prefix.len().min(buf.remaining());
            buf.put_slice(&this.prefix[..n]);
            this.prefix.advance(n);
            return Poll::Ready(Ok(()));
        }
        this.inner.poll_read(cx, buf)
    }
}

impl<S: AsyncWrite> AsyncWrite for Tunneled<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.project().inner.poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.project().inner.poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.project().inner.poll_shutdown(cx)
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        self.project().inner.poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn replays_prefix_before_inner() {
        let inner = tokio_test::io::Builder::new().read(b" world").build();
        let mut tunneled = Tunneled::new(inner, Bytes::from_static(b"hello"));
        assert_eq!(tunneled.buffered(), 5);

        let mut out = String::new();
        tunneled.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "hello world");
    }

    #[tokio::test]
    async fn small_reads_split_prefix() {
        let inner = tokio_test::io::Builder::new().build();
        let mut tunneled = Tunneled::new(inner, Bytes::from_static(b"abcdef"));

        let mut buf = [0u8; 4];
        let n = tunneled.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"abcd");
        let n = tunneled.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ef");
        assert_eq!(tunneled.buffered(), 0);
    }
}
