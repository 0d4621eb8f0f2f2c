//! Shared fixtures: a TLS origin, a plain origin and a counting CONNECT proxy.

#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn hello(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let response = match (req.method(), req.uri().path()) {
        (&Method::GET, "/get") => Response::new(Full::new(Bytes::from_static(b"Hello"))),
        _ => {
            let mut not_found = Response::new(Full::new(Bytes::from_static(b"Not Found")));
            *not_found.status_mut() = StatusCode::NOT_FOUND;
            not_found
        }
    };
    Ok(response)
}

/// Origin server answering `GET /get` with `200 Hello`.
pub struct TestOrigin {
    pub addr: SocketAddr,
    pub cert: Option<CertificateDer<'static>>,
}

impl TestOrigin {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Base URI using the `localhost` name the certificate was issued for.
    pub fn base_uri(&self) -> String {
        let scheme = if self.cert.is_some() { "https" } else { "http" };
        format!("{scheme}://localhost:{}", self.addr.port())
    }
}

/// HTTPS origin with a self-signed `localhost` certificate, speaking h2 and http/1.1.
pub async fn start_tls_origin() -> TestOrigin {
    start_tls_origin_with_alpn(&[b"h2".as_slice(), b"http/1.1".as_slice()]).await
}

/// HTTPS origin advertising exactly `alpn`. An empty list disables ALPN.
pub async fn start_tls_origin_with_alpn(alpn: &[&[u8]]) -> TestOrigin {
    let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
        .expect("self-signed certificate should generate");
    let cert = certified.cert.der().clone();
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(certified.signing_key.serialize_der()));

    let mut config = rustls::ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .expect("default protocol versions should be supported")
    .with_no_client_auth()
    .with_single_cert(vec![cert.clone()], key)
    .expect("server certificate should be accepted");
    config.alpn_protocols = alpn.iter().map(|p| p.to_vec()).collect();
    let acceptor = TlsAcceptor::from(Arc::new(config));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("origin should bind");
    let addr = listener.local_addr().expect("origin should have an address");

    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                let Ok(tls) = acceptor.accept(tcp).await else {
                    return;
                };
                let _ = auto::Builder::new(TokioExecutor::new())
                    .serve_connection(TokioIo::new(tls), service_fn(hello))
                    .await;
            });
        }
    });

    TestOrigin {
        addr,
        cert: Some(cert),
    }
}

/// Plain-text origin speaking http/1.1 and prior-knowledge h2.
pub async fn start_plain_origin() -> TestOrigin {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("origin should bind");
    let addr = listener.local_addr().expect("origin should have an address");

    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = auto::Builder::new(TokioExecutor::new())
                    .serve_connection(TokioIo::new(tcp), service_fn(hello))
                    .await;
            });
        }
    });

    TestOrigin { addr, cert: None }
}

/// Prior-knowledge h2 origin that answers one request per connection with
/// `200 Hello` and then closes it.
pub async fn start_one_shot_h2_origin() -> TestOrigin {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("origin should bind");
    let addr = listener.local_addr().expect("origin should have an address");

    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut conn) = h2::server::handshake(tcp).await else {
                    return;
                };
                if let Some(Ok((_request, mut respond))) = conn.accept().await
                    && let Ok(mut body) = respond.send_response(Response::new(()), false)
                {
                    let _ = body.send_data(Bytes::from_static(b"Hello"), true);
                }
                conn.graceful_shutdown();
                while conn.accept().await.is_some() {}
            });
        }
    });

    TestOrigin { addr, cert: None }
}

/// How the proxy answers CONNECT.
#[derive(Debug, Clone, Copy)]
pub enum ProxyMode {
    /// 200, then relay bytes both ways.
    Forward,
    /// The given status with a text body, then close.
    Reject(u16, &'static str),
    /// Something that is not HTTP.
    Garbage,
    /// Like `Forward`, after holding the reply back for this long.
    Delayed(Duration),
    /// Reads the CONNECT request and never answers.
    Silent,
}

/// CONNECT proxy that counts every tunnel request it sees.
pub struct TestProxy {
    pub addr: SocketAddr,
    connects: Arc<AtomicUsize>,
    heads: Arc<Mutex<Vec<String>>>,
}

impl TestProxy {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Raw request heads received, oldest first.
    pub fn heads(&self) -> Vec<String> {
        self.heads.lock().expect("heads lock").clone()
    }
}

pub async fn start_proxy(mode: ProxyMode) -> TestProxy {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("proxy should bind");
    let addr = listener.local_addr().expect("proxy should have an address");
    let connects = Arc::new(AtomicUsize::new(0));
    let heads = Arc::new(Mutex::new(Vec::new()));

    let (count, log) = (connects.clone(), heads.clone());
    tokio::spawn(async move {
        while let Ok((client, _)) = listener.accept().await {
            let (count, log) = (count.clone(), log.clone());
            tokio::spawn(async move {
                let _ = serve_tunnel(client, mode, count, log).await;
            });
        }
    });

    TestProxy {
        addr,
        connects,
        heads,
    }
}

async fn serve_tunnel(
    mut client: TcpStream,
    mode: ProxyMode,
    count: Arc<AtomicUsize>,
    log: Arc<Mutex<Vec<String>>>,
) -> std::io::Result<()> {
    let mut buf = Vec::with_capacity(1024);
    let (target, head_len) = loop {
        let mut chunk = [0u8; 1024];
        let n = client.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);

        let mut headers = [httparse::EMPTY_HEADER; 32];
        let mut req = httparse::Request::new(&mut headers);
        match req.parse(&buf) {
            Ok(httparse::Status::Complete(len)) => {
                if req.method != Some("CONNECT") {
                    client
                        .write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n")
                        .await?;
                    return Ok(());
                }
                break (req.path.unwrap_or_default().to_owned(), len);
            }
            Ok(httparse::Status::Partial) => {}
            Err(_) => return Ok(()),
        }
    };

    count.fetch_add(1, Ordering::SeqCst);
    log.lock()
        .expect("heads lock")
        .push(String::from_utf8_lossy(&buf[..head_len]).into_owned());

    match mode {
        ProxyMode::Forward => forward(client, &target, &buf[head_len..]).await?,
        ProxyMode::Delayed(delay) => {
            tokio::time::sleep(delay).await;
            forward(client, &target, &buf[head_len..]).await?;
        }
        ProxyMode::Silent => {
            std::future::pending::<()>().await;
        }
        ProxyMode::Reject(status, body) => {
            let response = format!(
                "HTTP/1.1 {status} Rejected\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            client.write_all(response.as_bytes()).await?;
            client.shutdown().await?;
        }
        ProxyMode::Garbage => {
            client.write_all(b"this is not http\r\n\r\n").await?;
            client.shutdown().await?;
        }
    }
    Ok(())
}

async fn forward(mut client: TcpStream, target: &str, early: &[u8]) -> std::io::Result<()> {
    let Ok(mut upstream) = TcpStream::connect(target).await else {
        client
            .write_all(b"HTTP/1.1 502 Bad Gateway\r\nContent-Length: 0\r\n\r\n")
            .await?;
        return Ok(());
    };
    client
        .write_all(b"HTTP/1.1 200 Connection established\r\n\r\n")
        .await?;
    if !early.is_empty() {
        upstream.write_all(early).await?;
    }
    tokio::io::copy_bidirectional(&mut client, &mut upstream).await?;
    Ok(())
}
