//! CLI definition using clap.
//!
//! Every setting can come from a flag or from its environment variable.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;

use clap::Parser;

/// Keeps one restream process per stream file running on a core service.
#[derive(Parser, Debug, Clone)]
#[command(name = "streamsync")]
#[command(version)]
#[command(
    about = "Keeps one restream process per stream file running on a core process service"
)]
#[command(
    long_about = "Watches a folder of <id>.stream files and creates, updates and deletes the matching processes on a core service. Only processes carrying the configured reference tag are ever changed."
)]
pub struct Cli {
    /// Base URL of the core service, e.g. http://core:8080
    #[arg(long, env = "CORE_ADDRESS")]
    pub core_address: String,

    /// Login name; leave empty for a core without authentication
    #[arg(long, env = "CORE_USERNAME", default_value = "")]
    pub core_username: String,

    /// Login password
    #[arg(long, env = "CORE_PASSWORD", default_value = "", hide_env_values = true)]
    pub core_password: String,

    /// Reference tag marking processes owned by this instance
    #[arg(long = "reference", env = "PROCESS_REFERENCE", default_value = "streamfile")]
    pub reference: String,

    /// Comma-separated output protocols (hls, rtmp, srt)
    #[arg(long, env = "OUTPUT_PROTOCOL", default_value = "hls")]
    pub output_protocol: String,

    /// Folder holding the .stream files
    #[arg(long, env = "STREAMFILE_FOLDER", default_value = "./streamfiles")]
    pub streamfile_folder: PathBuf,

    /// Seconds between reconciliation cycles
    #[arg(long = "interval", env = "SYNC_INTERVAL_SECONDS", default_value_t = 10)]
    pub interval: u64,

    /// Directory for HLS playlists inside the core in-memory filesystem
    #[arg(long, env = "HLS_PATH", default_value = "")]
    pub hls_path: String,

    /// Timeout in seconds for each request to core
    #[arg(long = "timeout", env = "CORE_TIMEOUT_SECONDS", default_value_t = 30)]
    pub timeout: u64,

    /// Run a single cycle and exit
    #[arg(long, default_value_t = false)]
    pub once: bool,

    /// Log planned changes without applying them
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}
