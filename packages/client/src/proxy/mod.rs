//! Proxy configuration and route resolution
//!
//! A [`Proxy`] describes one proxy configuration, [`ProxyResolver`] turns it
//! into an [`EffectiveRoute`] for a given origin, consulting a
//! [`SystemProxySource`] when the descriptor asks for the ambient settings.

pub mod core;
pub mod resolver;
pub mod system;

pub use core::{DEFAULT_PROXY_PORT, Extra, NoProxy, Proxy, ProxyBuilder, ProxyType};
pub use resolver::{EffectiveRoute, ProxyAddress, ProxyResolver};
pub use system::{EnvProxySource, NoSystemProxy, ProxySelector, SystemProxySource};
