//! TLS over direct and tunneled streams
//!
//! TLS always runs end to end with the origin. When a request goes through a
//! proxy the handshake travels inside the CONNECT tunnel and the proxy only
//! ever sees ciphertext.

mod config;
pub mod errors;
mod handshake;
mod verifier;

pub use config::TlsConfig;
pub use errors::TlsError;
pub(crate) use handshake::handshake;

/// ALPN identifier for HTTP/1.1
pub const ALPN_HTTP1: &[u8] = b"http/1.1";
/// ALPN identifier for HTTP/2
pub const ALPN_H2: &[u8] = b"h2";
