//! # Viaduct client
//!
//! Proxy-aware HTTP client engine: decides per request whether traffic goes
//! straight to the origin or through a forward proxy, negotiates HTTP CONNECT
//! tunnels, and runs TLS plus HTTP/1.1 or HTTP/2 over the resulting stream.
//!
//! ## Features
//!
//! - **Proxy descriptors** validated at construction, with no-proxy lists
//! - **Injectable system proxy source** read fresh on every request
//! - **One CONNECT negotiator** shared by both transports
//! - **End-to-end TLS** through the tunnel with rustls
//! - **HTTP/2 tunnel sharing** across concurrent requests
//! - **Structured errors** for retry decisions
//!
//! ## Usage
//!
//! ```no_run
//! use viaduct_client::{Http1Client, proxy::{Proxy, ProxySelector, ProxyAddress}};
//!
//! # async fn run() -> viaduct_client::Result<()> {
//! let selector = ProxySelector::of(ProxyAddress::new("proxy.internal", 3128));
//! let client = Http1Client::builder()
//!     .base_uri("https://example.com")
//!     .proxy(Proxy::system())
//!     .system_proxy_source(selector.clone())
//!     .build()?;
//!
//! let response = client.get("/get").request().await?;
//! assert_eq!(response.status(), 200);
//!
//! selector.clear();
//! let direct = client.get("/get").request().await?;
//! assert_eq!(direct.text()?, response.text()?);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod connect;
pub mod error;
pub mod http;
pub mod prelude;
pub mod protocols;
pub mod proxy;
pub mod tls;

pub use crate::client::{Client, ClientBuilder, ClientStatsSnapshot, Http1Client, Http2Client, RequestBuilder};
pub use crate::config::HttpConfig;
pub use crate::error::{Error, Kind, Result};
pub use crate::http::{HttpResponse, Origin, Scheme};
pub use crate::proxy::{EffectiveRoute, Proxy, ProxyResolver, ProxyType};
pub use crate::tls::TlsConfig;
