//! Shared error types for the airq service.
//!
//! This module provides a typed error hierarchy that:
//! - Keeps transport failures classified for logging
//! - Preserves full error context for debugging

use thiserror::Error;

/// Top-level application error type.
///
/// Startup and configuration failures end up here. Per-request failures
/// have their own taxonomy in the weather crate.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    /// Whether the failure came from the remote side rather than the link.
    pub fn is_upstream_fault(&self) -> bool {
        matches!(self, NetworkError::InvalidResponse(_))
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

/// Extension trait for converting reqwest errors to our error types.
///
/// HTTP status failures never reach this: the client inspects status codes
/// itself before reading a body.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_conversion() {
        let err = ConfigError::Invalid("upstream.api_key: API key is required".into());
        let app_err: AppError = err.into();
        assert!(matches!(app_err, AppError::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_upstream_fault_classification() {
        assert!(NetworkError::InvalidResponse("x".into()).is_upstream_fault());
        assert!(!NetworkError::Timeout.is_upstream_fault());
        assert!(!NetworkError::ConnectionFailed("refused".into()).is_upstream_fault());
    }
}
