//! # Viaduct
//!
//! Proxy-aware HTTP/1.1 and HTTP/2 clients with HTTP CONNECT tunneling.
//!
//! ```no_run
//! use viaduct::{Proxy, Viaduct};
//!
//! # async fn run() -> viaduct::Result<()> {
//! let client = Viaduct::http2()
//!     .base_uri("https://localhost:8443")
//!     .proxy(Proxy::http("127.0.0.1", 3128)?)
//!     .build()?;
//!
//! let response = client.get("/get").request().await?;
//! assert_eq!(response.text()?, "Hello");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

pub use viaduct_client::client::{ClientBuilder, ClientStatsSnapshot, RequestBuilder};
pub use viaduct_client::config::{Http2Settings, HttpConfig};
pub use viaduct_client::error::{Error, Kind, Result};
pub use viaduct_client::http::{HttpResponse, Origin, Scheme};
pub use viaduct_client::proxy::{
    EffectiveRoute, EnvProxySource, NoProxy, NoSystemProxy, Proxy, ProxyAddress, ProxyBuilder,
    ProxyResolver, ProxySelector, ProxyType, SystemProxySource,
};
pub use viaduct_client::tls::TlsConfig;
pub use viaduct_client::{Client, Http1Client, Http2Client, prelude};

pub use http::{HeaderMap, HeaderValue, Method, StatusCode};

use viaduct_client::protocols::{Http1Transport, Http2Transport};

/// Entry point with builder shortcuts for both client flavours.
pub struct Viaduct;

impl Viaduct {
    /// Builder for an HTTP/1.1 client.
    #[must_use]
    pub fn http1() -> ClientBuilder<Http1Transport> {
        Http1Client::builder()
    }

    /// Builder for an HTTP/2 client.
    #[must_use]
    pub fn http2() -> ClientBuilder<Http2Transport> {
        Http2Client::builder()
    }

    /// HTTP/1.1 client with defaults that honours the proxy environment
    /// variables.
    ///
    /// # Errors
    ///
    /// Fails only if the default TLS settings cannot be built.
    pub fn from_env() -> Result<Http1Client> {
        tracing::debug!(target: "viaduct", "building client from proxy environment");
        Http1Client::builder()
            .proxy(Proxy::system())
            .system_proxy_source(EnvProxySource)
            .build()
    }
}
