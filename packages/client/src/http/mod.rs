//! Origins and responses

pub mod origin;
pub mod response;

pub use origin::{Origin, Scheme};
pub use response::HttpResponse;
