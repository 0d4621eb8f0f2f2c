//! Fully-read HTTP responses
//!
//! Both transports collect the body before handing the response back, so the
//! caller sees the same shape regardless of protocol or route.

use bytes::Bytes;
use http::{HeaderMap, StatusCode, Version};

use crate::error::{self, Error};

/// A response whose body has been read to the end.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
}

impl HttpResponse {
    pub(crate) fn new(status: StatusCode, version: Version, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            version,
            headers,
            body,
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Protocol version the response arrived over
    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Raw body bytes
    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Consume the response, returning the body
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.body
    }

    /// Decode the body as UTF-8
    ///
    /// # Errors
    ///
    /// Returns a `Decode` error if the body is not valid UTF-8.
    pub fn text(&self) -> Result<String, Error> {
        String::from_utf8(self.body.to_vec()).map_err(error::decode)
    }
}
