//! The process service seam.
//!
//! The reconciler only sees `ProcessService`; `CoreProcessService` backs it
//! with the HTTP client and `InMemoryProcessService` (see `memory`) backs it
//! in tests.

use async_trait::async_trait;
use streamsync_client::CoreClient;
use streamsync_core::ProcessConfig;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::ObservedProcess;

/// Operations the reconciler performs against the process service.
#[async_trait]
pub trait ProcessService: Send + Sync {
    /// List every process with its stored config.
    async fn list_processes(&self) -> Result<Vec<ObservedProcess>>;

    /// Create a process.
    async fn create_process(&self, config: &ProcessConfig) -> Result<()>;

    /// Replace the config of process `id`.
    async fn replace_process(&self, id: &str, config: &ProcessConfig) -> Result<()>;

    /// Delete process `id`.
    async fn delete_process(&self, id: &str) -> Result<()>;
}

/// Process service backed by the core HTTP API.
#[derive(Debug, Clone)]
pub struct CoreProcessService {
    client: CoreClient,
}

impl CoreProcessService {
    /// Wrap an authenticated client.
    pub fn new(client: CoreClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProcessService for CoreProcessService {
    async fn list_processes(&self) -> Result<Vec<ObservedProcess>> {
        let processes = self.client.list_processes().await?;
        debug!(count = processes.len(), "Listed core processes");

        Ok(processes
            .into_iter()
            .map(|p| {
                let config = p
                    .config
                    .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));
                ObservedProcess::new(p.id, p.reference, config)
            })
            .collect())
    }

    async fn create_process(&self, config: &ProcessConfig) -> Result<()> {
        self.client
            .create_process(config)
            .await
            .map_err(|e| classify(config.id.as_str(), e))
    }

    async fn replace_process(&self, id: &str, config: &ProcessConfig) -> Result<()> {
        self.client
            .replace_process(id, config)
            .await
            .map_err(|e| classify(id, e))
    }

    async fn delete_process(&self, id: &str) -> Result<()> {
        self.client
            .delete_process(id)
            .await
            .map_err(|e| classify(id, e))
    }
}

fn classify(id: &str, error: streamsync_client::Error) -> Error {
    match error {
        streamsync_client::Error::NotFound { .. } => Error::process_not_found(id),
        streamsync_client::Error::Validation { reason } => Error::rejected(id, reason),
        other => Error::Service(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_maps_per_process_errors() {
        assert!(matches!(
            classify("cam", streamsync_client::Error::not_found("process cam")),
            Error::ProcessNotFound { ref id } if id == "cam"
        ));
        assert!(matches!(
            classify("cam", streamsync_client::Error::validation("bad address")),
            Error::Rejected { ref reason, .. } if reason == "bad address"
        ));
        assert!(classify("cam", streamsync_client::Error::service_unavailable("down")).is_transient());
    }
}
