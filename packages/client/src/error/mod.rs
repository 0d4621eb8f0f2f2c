//! Error types and classification

pub mod classification;
pub(crate) mod constructors;
pub mod helpers;
pub mod types;

pub(crate) use constructors::*;
pub use helpers::{BadScheme, TimedOut};
pub use types::{Error, Kind, Result};
