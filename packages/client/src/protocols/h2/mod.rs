//! Multiplexed HTTP/2 adapter
//!
//! Requests to the same origin over the same route share one connection,
//! and therefore one CONNECT tunnel.

mod pool;
mod transport;

pub use pool::H2Pool;
pub use transport::Http2Transport;
