//! Client configuration
//!
//! `HttpConfig` carries every tunable used while routing, tunneling and
//! speaking HTTP. Builder-style `with_*` setters live in [`builders`], range
//! checks in [`validation`].

pub mod builders;
pub mod types;
pub mod validation;

pub use types::{Http2Settings, HttpConfig};
pub use validation::{ConfigResult, ConfigValidator, ConfigurationError, Validator};
