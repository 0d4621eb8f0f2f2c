//! HTTP CONNECT tunnels
//!
//! One [`TunnelNegotiator`] is shared by both transport adapters. It turns a
//! fresh connection to a proxy into a [`Tunneled`] stream that behaves like a
//! direct socket to the origin.

mod error;
mod negotiator;
mod stream;

pub use error::NegotiationError;
pub use negotiator::{TunnelNegotiator, TunnelState};
pub use stream::Tunneled;
