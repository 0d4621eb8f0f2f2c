//! Proxy descriptor types, constructors and configuration methods

mod configuration;
mod constructors;
mod no_proxy;
mod types;

pub use no_proxy::NoProxy;
pub use types::{DEFAULT_PROXY_PORT, Extra, Proxy, ProxyBuilder, ProxyType};
