//! Validated runtime settings.
//!
//! `Settings` is built once from the parsed CLI before any network call, so a
//! bad protocol list or address stops the program before it logs in.

use std::path::PathBuf;
use std::time::Duration;

use streamsync_client::CoreConfig;
use streamsync_reconciler::{ProcessTemplate, ProtocolSet};
use thiserror::Error;

use crate::cli::Cli;

/// Startup configuration errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("sync interval must be at least one second")]
    ZeroInterval,

    #[error("request timeout must be at least one second")]
    ZeroTimeout,

    #[error("reference tag must not be empty")]
    EmptyReference,

    #[error("invalid output protocol list: {0}")]
    Protocol(#[from] streamsync_core::Error),

    #[error("invalid core settings: {0}")]
    Core(#[from] streamsync_client::Error),
}

/// Everything the binary needs to run, validated.
#[derive(Debug, Clone)]
pub struct Settings {
    pub core: CoreConfig,
    pub reference: String,
    pub protocols: ProtocolSet,
    pub folder: PathBuf,
    pub interval: Duration,
    pub hls_path: String,
    pub once: bool,
    pub dry_run: bool,
}

impl Settings {
    /// Template for the process configs this instance generates.
    pub fn template(&self) -> ProcessTemplate {
        ProcessTemplate::new(
            self.reference.as_str(),
            self.protocols.clone(),
            self.hls_path.as_str(),
        )
    }
}

impl TryFrom<Cli> for Settings {
    type Error = SettingsError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        if cli.interval == 0 {
            return Err(SettingsError::ZeroInterval);
        }
        if cli.timeout == 0 {
            return Err(SettingsError::ZeroTimeout);
        }
        let reference = cli.reference.trim().to_string();
        if reference.is_empty() {
            return Err(SettingsError::EmptyReference);
        }

        let protocols: ProtocolSet = cli.output_protocol.parse()?;
        let core = CoreConfig::from_address(&cli.core_address)?
            .credentials(cli.core_username, cli.core_password)
            .timeout(Duration::from_secs(cli.timeout));

        Ok(Self {
            core,
            reference,
            protocols,
            folder: cli.streamfile_folder,
            interval: Duration::from_secs(cli.interval),
            hls_path: cli.hls_path,
            once: cli.once,
            dry_run: cli.dry_run,
        })
    }
}
