//! Core error types for streamsync.
//!
//! All errors are explicit, typed, and recoverable - no panics allowed.

use std::path::PathBuf;

use thiserror::Error;

/// Core error type for descriptor, configuration, and document handling.
#[derive(Debug, Error)]
pub enum Error {
    // I/O errors
    #[error("failed to read file '{path}': {reason}")]
    FileReadFailed { path: PathBuf, reason: String },

    #[error("failed to read directory '{path}': {reason}")]
    DirectoryReadFailed { path: PathBuf, reason: String },

    // Naming errors
    #[error("invalid stream id '{value}': {reason}")]
    InvalidStreamId { value: String, reason: String },

    // Configuration errors
    #[error("unknown output protocol '{token}' (expected hls, rtmp or srt)")]
    UnknownProtocol { token: String },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // Parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a file read error.
    pub fn file_read_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FileReadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a directory read error.
    pub fn directory_read_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::DirectoryReadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid stream id error.
    pub fn invalid_stream_id(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidStreamId {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an unknown protocol error.
    pub fn unknown_protocol(token: impl Into<String>) -> Self {
        Self::UnknownProtocol {
            token: token.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Whether retrying on the next cycle can succeed without operator action.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::FileReadFailed { .. } | Self::DirectoryReadFailed { .. }
        )
    }
}
