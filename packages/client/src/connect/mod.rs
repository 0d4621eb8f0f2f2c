//! Connection establishment
//!
//! Opens the byte stream a transport adapter speaks over: a TCP connection
//! to the origin or to a proxy, a CONNECT tunnel through that proxy, and a
//! TLS session on top when the origin is `https`.

pub mod conn;
pub mod connector;
pub mod tcp;
pub mod tunnel;

pub use conn::{Conn, ConnectionTrait};
pub use connector::Connector;
pub use tunnel::{NegotiationError, TunnelNegotiator, TunnelState, Tunneled};
