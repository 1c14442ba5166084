//! Desired state assembly from stream files.

use std::path::PathBuf;

use async_trait::async_trait;
use streamsync_core::{ProcessConfig, ProcessIo, ProcessLimits};
use tracing::debug;

use crate::descriptor::{Descriptor, load_descriptors};
use crate::error::Result;
use crate::output::{ENDPOINT_ID, OutputPlan, ProtocolSet};
use crate::r#loop::DesiredStateProvider;
use crate::types::DesiredState;

/// Process type submitted for every stream.
pub const PROCESS_KIND: &str = "ffmpeg";

/// Settings shared by every generated process config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessTemplate {
    /// Ownership tag written into each config.
    pub reference: String,
    /// Outputs each stream is published to.
    pub protocols: ProtocolSet,
    /// Directory for HLS playlists inside the in-memory filesystem.
    pub hls_prefix: String,
}

impl ProcessTemplate {
    /// Create a template.
    pub fn new(
        reference: impl Into<String>,
        protocols: ProtocolSet,
        hls_prefix: impl Into<String>,
    ) -> Self {
        Self {
            reference: reference.into(),
            protocols,
            hls_prefix: hls_prefix.into(),
        }
    }

    /// Build the full process config for one descriptor.
    pub fn build(&self, descriptor: &Descriptor) -> ProcessConfig {
        let output = OutputPlan::build(&descriptor.id, &self.protocols, &self.hls_prefix);

        ProcessConfig {
            id: descriptor.id.clone(),
            kind: PROCESS_KIND.to_string(),
            reference: self.reference.clone(),
            input: vec![ProcessIo::new(
                ENDPOINT_ID,
                descriptor.source.as_str(),
                ["-re"],
            )],
            output: vec![output.endpoint()],
            options: vec!["-loglevel".to_string(), "info".to_string()],
            reconnect: true,
            reconnect_delay_seconds: 2,
            autostart: true,
            stale_timeout_seconds: 20,
            limits: ProcessLimits::disabled(),
        }
    }

    /// Build the desired state from descriptors. For a repeated id the last
    /// descriptor wins.
    pub fn assemble<'a>(&self, descriptors: impl IntoIterator<Item = &'a Descriptor>) -> DesiredState {
        let mut state = DesiredState::new();
        for descriptor in descriptors {
            if state.insert(self.build(descriptor)).is_some() {
                debug!(
                    id = %descriptor.id,
                    path = %descriptor.path.display(),
                    "Repeated stream id, keeping the later source"
                );
            }
        }
        state
    }
}

/// Desired state read from a folder of stream files.
#[derive(Debug, Clone)]
pub struct StreamfileProvider {
    folder: PathBuf,
    template: ProcessTemplate,
}

impl StreamfileProvider {
    /// Create a provider for `folder`.
    pub fn new(folder: impl Into<PathBuf>, template: ProcessTemplate) -> Self {
        Self {
            folder: folder.into(),
            template,
        }
    }
}

#[async_trait]
impl DesiredStateProvider for StreamfileProvider {
    async fn get_desired_state(&self) -> Result<DesiredState> {
        let descriptors = load_descriptors(&self.folder).await?;
        Ok(self.template.assemble(&descriptors))
    }
}
