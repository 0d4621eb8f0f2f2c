//! Per-request builder

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Method;

use super::core::Client;
use crate::error::{self, Error};
use crate::http::HttpResponse;
use crate::protocols::Transport;
use crate::proxy::Proxy;

/// A request being assembled. Nothing is sent until [`RequestBuilder::request`].
#[must_use = "a RequestBuilder does nothing until `request` is awaited"]
#[derive(Debug)]
pub struct RequestBuilder<'a, T: Transport> {
    client: &'a Client<T>,
    method: Method,
    target: String,
    headers: HeaderMap,
    body: Bytes,
    proxy: Option<Proxy>,
    error: Option<Error>,
}

impl<'a, T: Transport> RequestBuilder<'a, T> {
    pub(super) fn new(client: &'a Client<T>, method: Method, target: String) -> Self {
        RequestBuilder {
            client,
            method,
            target,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            proxy: None,
            error: None,
        }
    }

    /// Add a header. Repeating a name appends another value.
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        if self.error.is_none() {
            match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
                (Ok(name), Ok(value)) => {
                    self.headers.append(name, value);
                }
                (Err(e), _) => self.error = Some(error::request(Into::<http::Error>::into(e))),
                (_, Err(e)) => self.error = Some(error::request(Into::<http::Error>::into(e))),
            }
        }
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Route this request with `proxy` instead of the client's default.
    pub fn proxy(mut self, proxy: Proxy) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Send the request and collect the whole response.
    ///
    /// # Errors
    ///
    /// Fails with the structured kind of whatever went wrong: `Connect`,
    /// `TunnelRejected`, `ProtocolViolation`, `Tls`, `Request`, `Body` or
    /// `Timeout`. Nothing is retried.
    pub async fn request(self) -> Result<HttpResponse, Error> {
        if let Some(err) = self.error {
            return Err(err);
        }
        self.client
            .execute(
                self.method,
                &self.target,
                self.headers,
                self.body,
                self.proxy.as_ref(),
            )
            .await
    }
}
