//! Single-stream HTTP/1.1 adapter
//!
//! Every request gets its own connection, and with it its own tunnel.

use bytes::Bytes;
use http::header::{HOST, HeaderValue};
use http::{Request, Uri, Version};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;

use super::Transport;
use crate::connect::Connector;
use crate::error::{self, Error};
use crate::http::{HttpResponse, Origin};
use crate::proxy::{EffectiveRoute, Extra};
use crate::tls::ALPN_HTTP1;

/// HTTP/1.1 over a direct or tunneled connection.
#[derive(Debug, Clone)]
pub struct Http1Transport {
    connector: Connector,
}

impl Transport for Http1Transport {
    const ALPN: &'static [u8] = ALPN_HTTP1;

    fn new(connector: Connector) -> Self {
        Http1Transport { connector }
    }

    fn connector(&self) -> &Connector {
        &self.connector
    }

    async fn execute(
        &self,
        route: EffectiveRoute,
        origin: Origin,
        extra: Extra,
        request: Request<Bytes>,
    ) -> Result<HttpResponse, Error> {
        let conn = self.connector.open_connection(&route, &origin, &extra).await?;
        if let Some(alpn) = conn.negotiated_alpn()
            && alpn != ALPN_HTTP1
        {
            return Err(error::connect(format!(
                "server negotiated unexpected protocol {:?}",
                String::from_utf8_lossy(alpn)
            )));
        }

        let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(conn))
            .await
            .map_err(error::request)?;

        let conn_origin = origin.clone();
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::debug!(target: "viaduct::http1", origin = %conn_origin, error = %e, "connection error");
            }
        });

        let request = to_origin_form(request, &origin)?;
        let response = sender.send_request(request).await.map_err(error::request)?;

        let (parts, body) = response.into_parts();
        let body = body.collect().await.map_err(error::body)?.to_bytes();
        Ok(HttpResponse::new(parts.status, parts.version, parts.headers, body))
    }
}

/// Rewrite an absolute-URI request into the form sent on the wire:
/// path-and-query target plus an explicit `Host` header.
fn to_origin_form(request: Request<Bytes>, origin: &Origin) -> Result<Request<Full<Bytes>>, Error> {
    let (mut parts, body) = request.into_parts();

    let target = parts
        .uri
        .path_and_query()
        .map_or("/", |pq| pq.as_str())
        .parse::<Uri>()
        .map_err(error::request)?;
    parts.uri = target;
    parts.version = Version::HTTP_11;

    if !parts.headers.contains_key(HOST) {
        let host = HeaderValue::from_str(&origin.host_header()).map_err(error::request)?;
        parts.headers.insert(HOST, host);
    }

    Ok(Request::from_parts(parts, Full::new(body)))
}
