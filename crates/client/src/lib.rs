#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # streamsync-client
//!
//! HTTP client for the core process-management API (v3).
//!
//! ## Example
//!
//! ```ignore
//! use streamsync_client::{CoreClient, CoreConfig};
//!
//! let config = CoreConfig::from_address("http://core:8080")?.credentials("admin", "secret");
//! let client = CoreClient::new(config)?;
//! client.login().await?;
//!
//! for process in client.list_processes().await? {
//!     println!("{} ({})", process.id, process.reference);
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::CoreClient;
pub use config::CoreConfig;
pub use error::{Error, Result};
pub use types::Process;
