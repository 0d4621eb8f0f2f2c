//! CONNECT request/response exchange

use std::fmt;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode, header};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use super::error::NegotiationError;
use super::stream::Tunneled;
use crate::config::HttpConfig;
use crate::error::TimedOut;
use crate::http::Origin;
use crate::proxy::Extra;

const MAX_HEADERS: usize = 64;
const READ_CHUNK: usize = 1024;

/// Progress of one CONNECT attempt.
///
/// A negotiation starts `Pending` and ends in exactly one terminal state.
/// There is no retry inside the negotiator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelState {
    /// Request sent, waiting for the proxy.
    Pending,
    /// The proxy answered 2xx.
    Established,
    /// Rejected, malformed, closed early or timed out.
    Failed,
}

impl TunnelState {
    /// Whether the attempt has finished.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, TunnelState::Pending)
    }
}

impl fmt::Display for TunnelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TunnelState::Pending => "pending",
            TunnelState::Established => "established",
            TunnelState::Failed => "failed",
        })
    }
}

/// Performs the CONNECT handshake on a fresh proxy connection.
#[derive(Clone)]
pub struct TunnelNegotiator {
    user_agent: String,
    extra: Extra,
    timeout: Duration,
    max_response_size: usize,
}

impl TunnelNegotiator {
    /// Negotiator using the user agent, tunnel timeout and response size
    /// limit from `config`.
    #[must_use]
    pub fn new(config: &HttpConfig) -> Self {
        TunnelNegotiator {
            user_agent: config.user_agent.clone(),
            extra: Extra::default(),
            timeout: config.tunnel_timeout,
            max_response_size: config.max_connect_response_size,
        }
    }

    /// Send the descriptor's `Proxy-Authorization` and extra headers.
    #[must_use]
    pub fn with_extra(mut self, extra: &Extra) -> Self {
        self.extra = extra.clone();
        self
    }

    /// Ask the proxy on `stream` to open a tunnel to `origin`.
    ///
    /// On success the returned stream carries raw bytes to and from the
    /// origin. On failure `stream` is dropped, closing the connection.
    ///
    /// # Errors
    ///
    /// - [`NegotiationError::Rejected`] for any non-2xx status
    /// - [`NegotiationError::Malformed`], [`NegotiationError::UnexpectedEof`],
    ///   [`NegotiationError::HeadTooLarge`] or [`NegotiationError::Timeout`]
    ///   when the proxy breaks the exchange
    /// - [`NegotiationError::Io`] when the connection itself fails
    pub async fn negotiate<S>(
        &self,
        mut stream: S,
        origin: &Origin,
    ) -> Result<Tunneled<S>, NegotiationError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut attempt = Attempt::new(origin);
        let deadline = Instant::now() + self.timeout;

        let head = tokio::time::timeout_at(deadline, self.exchange(&mut stream, origin)).await;
        let (status, headers, mut buf) = match head {
            Ok(Ok(head)) => head,
            Ok(Err(e)) => return Err(attempt.fail(e)),
            Err(_) => return Err(attempt.fail(NegotiationError::Timeout(TimedOut))),
        };

        if status.is_success() {
            attempt.establish(status);
            return Ok(Tunneled::new(stream, buf.split().freeze()));
        }

        let body = tokio::time::timeout_at(
            deadline,
            drain_body(&mut stream, &headers, &mut buf, self.max_response_size),
        )
        .await
        .unwrap_or_else(|_| buf.split().freeze());

        tracing::warn!(
            target: "viaduct::tunnel",
            origin = %origin,
            status = status.as_u16(),
            body_len = body.len(),
            "proxy rejected CONNECT"
        );
        Err(attempt.fail(NegotiationError::Rejected { status, body }))
    }

    async fn exchange<S>(
        &self,
        stream: &mut S,
        origin: &Origin,
    ) -> Result<(StatusCode, HeaderMap, BytesMut), NegotiationError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        stream.write_all(&self.encode_request(origin)).await?;
        stream.flush().await?;
        self.read_head(stream).await
    }

    pub(crate) fn encode_request(&self, origin: &Origin) -> Vec<u8> {
        let authority = origin.authority();
        let mut req = Vec::with_capacity(128);

        req.extend_from_slice(format!("CONNECT {authority} HTTP/1.1\r\n").as_bytes());
        req.extend_from_slice(format!("Host: {authority}\r\n").as_bytes());
        if !self.user_agent.is_empty() {
            req.extend_from_slice(format!("User-Agent: {}\r\n", self.user_agent).as_bytes());
        }
        if let Some(auth) = self.extra.auth() {
            req.extend_from_slice(b"Proxy-Authorization: ");
            req.extend_from_slice(auth.as_bytes());
            req.extend_from_slice(b"\r\n");
        }
        if let Some(headers) = self.extra.headers() {
            for (name, value) in headers {
                if name == header::HOST
                    || name == header::USER_AGENT
                    || (name == header::PROXY_AUTHORIZATION && self.extra.auth().is_some())
                {
                    continue;
                }
                req.extend_from_slice(name.as_str().as_bytes());
                req.extend_from_slice(b": ");
                req.extend_from_slice(value.as_bytes());
                req.extend_from_slice(b"\r\n");
            }
        }
        req.extend_from_slice(b"\r\n");
        req
    }

    async fn read_head<S>(
        &self,
        stream: &mut S,
    ) -> Result<(StatusCode, HeaderMap, BytesMut), NegotiationError>
    where
        S: AsyncRead + Unpin,
    {
        let mut buf = BytesMut::with_capacity(READ_CHUNK);

        loop {
            buf.reserve(READ_CHUNK);
            if stream.read_buf(&mut buf).await? == 0 {
                return Err(NegotiationError::UnexpectedEof);
            }

            let mut raw = [httparse::EMPTY_HEADER; MAX_HEADERS];
            let mut res = httparse::Response::new(&mut raw);
            match res.parse(&buf) {
                Ok(httparse::Status::Complete(len)) => {
                    let code = res.code.unwrap_or_default();
                    let status = StatusCode::from_u16(code).map_err(|_| {
                        NegotiationError::Malformed(format!("invalid status code {code}"))
                    })?;
                    let headers = collect_headers(res.headers);
                    let _ = buf.split_to(len);
                    return Ok((status, headers, buf));
                }
                Ok(httparse::Status::Partial) => {
                    if buf.len() >= self.max_response_size {
                        return Err(NegotiationError::HeadTooLarge {
                            limit: self.max_response_size,
                        });
                    }
                }
                Err(e) => return Err(NegotiationError::Malformed(e.to_string())),
            }
        }
    }
}

impl fmt::Debug for TunnelNegotiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TunnelNegotiator")
            .field("user_agent", &self.user_agent)
            .field("extra", &self.extra)
            .field("timeout", &self.timeout)
            .field("max_response_size", &self.max_response_size)
            .finish()
    }
}

struct Attempt<'a> {
    origin: &'a Origin,
    state: TunnelState,
}

impl<'a> Attempt<'a> {
    fn new(origin: &'a Origin) -> Self {
        tracing::debug!(target: "viaduct::tunnel", origin = %origin, "sending CONNECT");
        Attempt {
            origin,
            state: TunnelState::Pending,
        }
    }

    fn establish(&mut self, status: StatusCode) {
        self.transition(TunnelState::Established);
        tracing::debug!(
            target: "viaduct::tunnel",
            origin = %self.origin,
            status = status.as_u16(),
            "tunnel established"
        );
    }

    fn fail(&mut self, err: NegotiationError) -> NegotiationError {
        self.transition(TunnelState::Failed);
        if !matches!(err, NegotiationError::Rejected { .. }) {
            tracing::debug!(target: "viaduct::tunnel", origin = %self.origin, error = %err, "CONNECT failed");
        }
        err
    }

    fn transition(&mut self, next: TunnelState) {
        debug_assert!(!self.state.is_terminal(), "tunnel state already {}", self.state);
        tracing::trace!(target: "viaduct::tunnel", from = %self.state, to = %next, "tunnel state");
        self.state = next;
    }
}

fn collect_headers(raw: &[httparse::Header<'_>]) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(raw.len());
    for h in raw {
        if let (Ok(name), Ok(value)) = (
            header::HeaderName::from_bytes(h.name.as_bytes()),
            header::HeaderValue::from_bytes(h.value),
        ) {
            headers.append(name, value);
        }
    }
    headers
}

fn content_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn is_chunked(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::TRANSFER_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.to_ascii_lowercase().contains("chunked"))
}

fn closes_after_response(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("close"))
}

/// Read what is left of an error response body, at most `limit` bytes.
///
/// A body without `Content-Length` or chunked framing is only read to the end
/// when the proxy announced `Connection: close`. Otherwise the bytes that
/// arrived with the head are all there is. IO errors end the drain early and
/// keep what was read so far.
async fn drain_body<S>(stream: &mut S, headers: &HeaderMap, buf: &mut BytesMut, limit: usize) -> Bytes
where
    S: AsyncRead + Unpin,
{
    if let Some(len) = content_length(headers) {
        let want = len.min(limit);
        while buf.len() < want {
            buf.reserve(READ_CHUNK);
            match stream.read_buf(buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
        buf.truncate(want);
        return buf.split().freeze();
    }

    let chunked = is_chunked(headers);
    if !chunked && !closes_after_response(headers) {
        buf.truncate(limit);
        return buf.split().freeze();
    }

    while buf.len() < limit && !(chunked && buf.ends_with(b"0\r\n\r\n")) {
        buf.reserve(READ_CHUNK);
        match stream.read_buf(buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
    }
    buf.truncate(limit);
    let raw = buf.split().freeze();

    if chunked {
        decode_chunked(&raw)
    } else {
        raw
    }
}

/// Best effort chunked decoding. Stops at the first malformed chunk.
fn decode_chunked(mut raw: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(raw.len());
    while let Ok(httparse::Status::Complete((start, size))) = httparse::parse_chunk_size(raw) {
        let Ok(size) = usize::try_from(size) else { break };
        if size == 0 {
            break;
        }
        let end = (start + size).min(raw.len());
        out.extend_from_slice(&raw[start..end]);
        if end + 2 > raw.len() {
            break;
        }
        raw = &raw[end + 2..];
    }
    out.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Scheme;
    use http::HeaderValue;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn origin() -> Origin {
        Origin::new(Scheme::Https, "example.com", 443)
    }

    fn negotiator() -> TunnelNegotiator {
        TunnelNegotiator::new(&HttpConfig::default().with_user_agent("test-agent"))
    }

    const REQUEST: &[u8] =
        b"CONNECT example.com:443 HTTP/1.1\r\nHost: example.com:443\r\nUser-Agent: test-agent\r\n\r\n";

    #[tokio::test]
    async fn established_on_200() {
        let mock = tokio_test::io::Builder::new()
            .write(REQUEST)
            .read(b"HTTP/1.1 200 Connection established\r\n\r\n")
            .build();

        let tunneled = negotiator().negotiate(mock, &origin()).await.unwrap();
        assert_eq!(tunneled.buffered(), 0);
    }

    #[tokio::test]
    async fn any_2xx_is_success() {
        let mock = tokio_test::io::Builder::new()
            .write(REQUEST)
            .read(b"HTTP/1.0 204 No Content\r\nProxy-Agent: x\r\n\r\n")
            .build();

        assert!(negotiator().negotiate(mock, &origin()).await.is_ok());
    }

    #[tokio::test]
    async fn head_split_across_reads() {
        let mock = tokio_test::io::Builder::new()
            .write(REQUEST)
            .read(b"HTTP/1.1 200 OK\r\nVia: ")
            .read(b"proxy\r\n")
            .read(b"\r\n")
            .build();

        assert!(negotiator().negotiate(mock, &origin()).await.is_ok());
    }

    #[tokio::test]
    async fn bytes_after_head_are_replayed() {
        let mock = tokio_test::io::Builder::new()
            .write(REQUEST)
            .read(b"HTTP/1.1 200 OK\r\n\r\nearly")
            .read(b" bytes")
            .build();

        let mut tunneled = negotiator().negotiate(mock, &origin()).await.unwrap();
        assert_eq!(tunneled.buffered(), 5);
        let mut out = String::new();
        tunneled.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "early bytes");
    }

    #[tokio::test]
    async fn rejected_with_content_length_body() {
        let mock = tokio_test::io::Builder::new()
            .write(REQUEST)
            .read(b"HTTP/1.1 407 Proxy Authentication Required\r\nContent-Length: 6\r\n\r\ndeni")
            .read(b"ed")
            .build();

        let err = negotiator().negotiate(mock, &origin()).await.unwrap_err();
        match err {
            NegotiationError::Rejected { status, body } => {
                assert_eq!(status, StatusCode::PROXY_AUTHENTICATION_REQUIRED);
                assert_eq!(&body[..], b"denied");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejected_body_read_until_close() {
        let mock = tokio_test::io::Builder::new()
            .write(REQUEST)
            .read(b"HTTP/1.1 502 Bad Gateway\r\nConnection: close\r\n\r\nupstream ")
            .read(b"down")
            .build();

        let err = negotiator().negotiate(mock, &origin()).await.unwrap_err();
        assert_eq!(err.body().unwrap(), &Bytes::from_static(b"upstream down"));
    }

    #[tokio::test(start_paused = true)]
    async fn unframed_rejection_on_open_connection_returns_promptly() {
        let (client, mut server) = tokio::io::duplex(4096);
        server
            .write_all(b"HTTP/1.1 403 Forbidden\r\n\r\nblocked")
            .await
            .unwrap();

        let config = HttpConfig::default()
            .with_user_agent("test-agent")
            .with_tunnel_timeout(Duration::from_secs(10));
        let negotiator = TunnelNegotiator::new(&config);
        let origin = origin();
        let negotiation = negotiator.negotiate(client, &origin);
        let err = tokio::time::timeout(Duration::from_secs(1), negotiation)
            .await
            .expect("rejection should not wait for the tunnel deadline")
            .unwrap_err();

        match err {
            NegotiationError::Rejected { status, body } => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(&body[..], b"blocked");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        drop(server);
    }

    #[tokio::test]
    async fn rejected_chunked_body_is_decoded() {
        let mock = tokio_test::io::Builder::new()
            .write(REQUEST)
            .read(b"HTTP/1.1 403 Forbidden\r\nTransfer-Encoding: chunked\r\n\r\n")
            .read(b"4\r\nno p\r\n5\r\nroxy!\r\n0\r\n\r\n")
            .build();

        let err = negotiator().negotiate(mock, &origin()).await.unwrap_err();
        assert_eq!(err.body().unwrap(), &Bytes::from_static(b"no proxy!"));
    }

    #[tokio::test]
    async fn garbage_is_malformed() {
        let mock = tokio_test::io::Builder::new()
            .write(REQUEST)
            .read(b"SSH-2.0-OpenSSH\r\n\r\n")
            .build();

        let err = negotiator().negotiate(mock, &origin()).await.unwrap_err();
        assert!(matches!(err, NegotiationError::Malformed(_)));
    }

    #[tokio::test]
    async fn early_close_is_eof() {
        let mock = tokio_test::io::Builder::new()
            .write(REQUEST)
            .read(b"HTTP/1.1 200")
            .build();

        let err = negotiator().negotiate(mock, &origin()).await.unwrap_err();
        assert!(matches!(err, NegotiationError::UnexpectedEof));
    }

    #[tokio::test]
    async fn oversized_head_is_rejected() {
        let config = HttpConfig::default()
            .with_user_agent("test-agent")
            .with_max_connect_response_size(256);
        let mut head = b"HTTP/1.1 200 OK\r\nX-Pad: ".to_vec();
        head.extend(std::iter::repeat_n(b'a', 512));

        let mock = tokio_test::io::Builder::new().write(REQUEST).read(&head).build();

        let err = TunnelNegotiator::new(&config)
            .negotiate(mock, &origin())
            .await
            .unwrap_err();
        assert!(matches!(err, NegotiationError::HeadTooLarge { limit: 256 }));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_proxy_times_out() {
        let (client, _server) = tokio::io::duplex(1024);
        let config = HttpConfig::default().with_tunnel_timeout(Duration::from_secs(2));

        let err = TunnelNegotiator::new(&config)
            .negotiate(client, &origin())
            .await
            .unwrap_err();
        assert!(matches!(err, NegotiationError::Timeout(_)));
    }

    #[test]
    fn request_carries_auth_and_extra_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-trace", HeaderValue::from_static("abc"));
        headers.insert(header::HOST, HeaderValue::from_static("ignored"));
        let extra = crate::proxy::Proxy::http("proxy", 3128)
            .unwrap()
            .custom_http_auth(HeaderValue::from_static("Basic dXNlcjpwdw=="))
            .custom_headers(headers)
            .extra()
            .clone();

        let raw = negotiator().with_extra(&extra).encode_request(&origin());
        let text = String::from_utf8(raw).unwrap();
        assert!(text.starts_with("CONNECT example.com:443 HTTP/1.1\r\nHost: example.com:443\r\n"));
        assert!(text.contains("Proxy-Authorization: Basic dXNlcjpwdw==\r\n"));
        assert!(text.contains("x-trace: abc\r\n"));
        assert!(!text.contains("ignored"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn ipv6_origin_is_bracketed() {
        let origin = Origin::new(Scheme::Https, "::1", 8443);
        let raw = negotiator().encode_request(&origin);
        assert!(raw.starts_with(b"CONNECT [::1]:8443 HTTP/1.1\r\nHost: [::1]:8443\r\n"));
    }

    #[test]
    fn state_terminality() {
        assert!(!TunnelState::Pending.is_terminal());
        assert!(TunnelState::Established.is_terminal());
        assert!(TunnelState::Failed.is_terminal());
    }
}
