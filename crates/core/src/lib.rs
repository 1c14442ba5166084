#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # streamsync-core
//!
//! Shared process types, errors, and result helpers.

pub mod error;
pub mod result;
pub mod types;

pub use error::Error;
pub use result::{Result, ResultExt};
pub use types::{ProcessConfig, ProcessIo, ProcessLimits, StreamId};
