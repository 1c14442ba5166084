//! Error types for the core client.

use thiserror::Error;

/// Result type for core client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the core service.
#[derive(Error, Debug)]
pub enum Error {
    /// Core could not be reached or answered with a server error.
    #[error("service unavailable: {reason}")]
    ServiceUnavailable { reason: String },

    /// Credentials were rejected or the session could not be renewed.
    #[error("authentication failed: {reason}")]
    Auth { reason: String },

    /// The addressed process does not exist.
    #[error("not found: {resource}")]
    NotFound { resource: String },

    /// Core rejected the submitted document.
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    /// Core answered with something we could not interpret.
    #[error("invalid response: {reason}")]
    InvalidResponse { reason: String },

    /// Configuration error.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// URL parse error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl Error {
    /// Create a service unavailable error.
    pub fn service_unavailable(reason: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            reason: reason.into(),
        }
    }

    /// Create an authentication error.
    pub fn auth(reason: impl Into<String>) -> Self {
        Self::Auth {
            reason: reason.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Create an invalid response error.
    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }

    /// Create a config error.
    pub fn config_error(reason: impl Into<String>) -> Self {
        Self::ConfigError {
            reason: reason.into(),
        }
    }

    /// Check if this error is worth retrying on the next cycle.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable { .. } | Self::Auth { .. })
    }
}
