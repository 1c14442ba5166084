//! Error types for the reconciler crate.

use thiserror::Error;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciler error types.
#[derive(Debug, Error)]
pub enum Error {
    /// The process service could not be reached.
    #[error("process service unavailable: {reason}")]
    ServiceUnavailable { reason: String },

    /// The addressed process does not exist.
    #[error("process '{id}' not found")]
    ProcessNotFound { id: String },

    /// The process service refused a submitted config.
    #[error("process '{id}' rejected: {reason}")]
    Rejected { id: String, reason: String },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Error reported by the core API client.
    #[error(transparent)]
    Service(#[from] streamsync_client::Error),

    /// Descriptor, naming, or document error.
    #[error(transparent)]
    Core(#[from] streamsync_core::Error),
}

impl Error {
    /// Create a service unavailable error.
    pub fn service_unavailable(reason: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            reason: reason.into(),
        }
    }

    /// Create a process not found error.
    pub fn process_not_found(id: impl Into<String>) -> Self {
        Self::ProcessNotFound { id: id.into() }
    }

    /// Create a rejected error.
    pub fn rejected(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Whether the next cycle may succeed without operator action.
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::ServiceUnavailable { .. } => true,
            Self::Service(e) => e.is_retryable(),
            Self::Core(e) => e.is_transient(),
            Self::ProcessNotFound { .. } | Self::Rejected { .. } | Self::InvalidConfig { .. } => {
                false
            }
        }
    }
}
