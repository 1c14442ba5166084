//! Result type definition and extension traits.

use crate::error::Error;

/// The standard Result type for streamsync core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait providing logging combinators for Results.
///
/// Used where a failed item should be skipped rather than abort a whole scan.
pub trait ResultExt<T> {
    /// Convert a Result to an Option, logging the error as a warning.
    fn into_option_logged(self) -> Option<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn into_option_logged(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping item");
                None
            }
        }
    }
}
