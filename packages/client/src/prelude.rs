//! Types most callers need

pub use crate::client::{Http1Client, Http2Client};
pub use crate::config::HttpConfig;
pub use crate::error::{Error, Kind, Result};
pub use crate::http::HttpResponse;
pub use crate::proxy::{
    EffectiveRoute, EnvProxySource, NoSystemProxy, Proxy, ProxyAddress, ProxySelector, ProxyType,
    SystemProxySource,
};
pub use crate::tls::TlsConfig;

pub use ::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Version};
