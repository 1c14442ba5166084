#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # streamsync
//!
//! Keeps one restream process per stream file running on a core process
//! service. The binary wires the CLI, the core client and the reconciliation
//! loop together; the pieces live in the workspace crates.

pub mod cli;
pub mod settings;

pub use cli::Cli;
pub use settings::{Settings, SettingsError};
