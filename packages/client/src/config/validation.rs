//! Configuration validation

use std::time::Duration;

use super::types::HttpConfig;

const MAX_WINDOW_SIZE: u32 = (1 << 31) - 1;

/// Configuration validation result type
pub type ConfigResult<T> = Result<T, ConfigurationError>;

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Invalid timeout value: {0}")]
    InvalidTimeout(String),

    #[error("Invalid buffer size: {0}")]
    InvalidBufferSize(String),

    #[error("Invalid configuration parameter: {0}")]
    InvalidParameter(String),
}

/// Configuration validation trait
pub trait Validator {
    /// Validates the configuration settings
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` variant describing the first bad value.
    fn validate(&self) -> ConfigResult<()>;
}

/// Common configuration validation utilities
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate timeout duration
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidTimeout` if the timeout is zero or
    /// exceeds one hour.
    pub fn validate_timeout(timeout: Duration, name: &str) -> ConfigResult<()> {
        if timeout.is_zero() {
            return Err(ConfigurationError::InvalidTimeout(format!(
                "{name} cannot be zero"
            )));
        }

        if timeout.as_secs() > 3600 {
            return Err(ConfigurationError::InvalidTimeout(format!(
                "{name} cannot exceed 1 hour"
            )));
        }

        Ok(())
    }

    /// Validate buffer size
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidBufferSize` if the size is below
    /// `min` or above 16MiB.
    pub fn validate_buffer_size(size: usize, min: usize, name: &str) -> ConfigResult<()> {
        if size < min {
            return Err(ConfigurationError::InvalidBufferSize(format!(
                "{name} must be at least {min} bytes"
            )));
        }

        if size > 16 * 1024 * 1024 {
            return Err(ConfigurationError::InvalidBufferSize(format!(
                "{name} cannot exceed 16MiB"
            )));
        }

        Ok(())
    }
}

impl Validator for HttpConfig {
    fn validate(&self) -> ConfigResult<()> {
        ConfigValidator::validate_timeout(self.timeout, "request timeout")?;
        ConfigValidator::validate_timeout(self.connect_timeout, "connect timeout")?;
        ConfigValidator::validate_timeout(self.tunnel_timeout, "tunnel timeout")?;
        ConfigValidator::validate_timeout(self.tls_handshake_timeout, "tls handshake timeout")?;
        ConfigValidator::validate_buffer_size(
            self.max_connect_response_size,
            256,
            "max CONNECT response size",
        )?;

        if self.user_agent.is_empty() {
            return Err(ConfigurationError::InvalidParameter(
                "user agent cannot be empty".to_owned(),
            ));
        }
        if http::HeaderValue::from_str(&self.user_agent).is_err() {
            return Err(ConfigurationError::InvalidParameter(
                "user agent is not a valid header value".to_owned(),
            ));
        }

        // RFC 9113 §6.5.2 bounds
        for (window, name) in [
            (self.http2.initial_stream_window_size, "initial stream window size"),
            (self.http2.initial_connection_window_size, "initial connection window size"),
        ] {
            if window > MAX_WINDOW_SIZE {
                return Err(ConfigurationError::InvalidParameter(format!(
                    "http2 {name} {window} exceeds {MAX_WINDOW_SIZE}"
                )));
            }
        }
        let frame = self.http2.max_frame_size;
        if !(16_384..=16_777_215).contains(&frame) {
            return Err(ConfigurationError::InvalidParameter(format!(
                "http2 max frame size {frame} outside 16384..=16777215"
            )));
        }
        if self.http2.max_concurrent_streams == 0 {
            return Err(ConfigurationError::InvalidParameter(
                "http2 max concurrent streams must be greater than zero".to_owned(),
            ));
        }

        Ok(())
    }
}

impl From<ConfigurationError> for crate::Error {
    fn from(err: ConfigurationError) -> Self {
        crate::error::configuration(err)
    }
}
