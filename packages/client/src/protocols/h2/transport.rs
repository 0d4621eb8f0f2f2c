use bytes::{Bytes, BytesMut};
use http::header::HOST;
use http::{Request, Version};

use super::pool::H2Pool;
use crate::connect::Connector;
use crate::error::{self, Error};
use crate::http::{HttpResponse, Origin};
use crate::proxy::{EffectiveRoute, Extra};
use crate::protocols::Transport;
use crate::tls::ALPN_H2;

/// HTTP/2 over a shared direct or tunneled connection.
#[derive(Debug, Clone)]
pub struct Http2Transport {
    pool: H2Pool,
}

impl Http2Transport {
    /// Connection pool behind this adapter.
    #[must_use]
    pub fn pool(&self) -> &H2Pool {
        &self.pool
    }
}

impl Transport for Http2Transport {
    const ALPN: &'static [u8] = ALPN_H2;

    fn new(connector: Connector) -> Self {
        Http2Transport {
            pool: H2Pool::new(connector),
        }
    }

    fn connector(&self) -> &Connector {
        self.pool.connector()
    }

    async fn execute(
        &self,
        route: EffectiveRoute,
        origin: Origin,
        extra: Extra,
        request: Request<Bytes>,
    ) -> Result<HttpResponse, Error> {
        let mut sender = self.pool.sender(&route, &origin, &extra).await?;

        let (mut parts, body) = request.into_parts();
        parts.version = Version::HTTP_2;
        parts.headers.remove(HOST);
        let request = Request::from_parts(parts, ());

        let end_of_stream = body.is_empty();
        let (response, mut stream) = sender
            .send_request(request, end_of_stream)
            .map_err(error::request)?;
        if !end_of_stream {
            stream.send_data(body, true).map_err(error::request)?;
        }

        let response = response.await.map_err(error::request)?;
        let (parts, mut body) = response.into_parts();

        let mut buf = BytesMut::new();
        while let Some(chunk) = body.data().await {
            let chunk = chunk.map_err(error::body)?;
            body.flow_control()
                .release_capacity(chunk.len())
                .map_err(error::body)?;
            buf.extend_from_slice(&chunk);
        }

        tracing::trace!(
            target: "viaduct::h2",
            origin = %origin,
            status = parts.status.as_u16(),
            len = buf.len(),
            "response complete"
        );
        Ok(HttpResponse::new(parts.status, parts.version, parts.headers, buf.freeze()))
    }
}
