//! Proxy-aware HTTP clients
//!
//! [`Client`] is generic over the [`Transport`](crate::protocols::Transport)
//! it speaks. [`Http1Client`] and [`Http2Client`] are the two concrete
//! flavours; routing, tunneling and TLS behave the same in both.

pub mod builder;
pub mod core;
pub mod request;
pub mod stats;

pub use builder::ClientBuilder;
pub use core::{Client, Http1Client, Http2Client};
pub use request::RequestBuilder;
pub use stats::{ClientStats, ClientStatsSnapshot};
