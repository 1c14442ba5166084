//! In-memory process service for tests and dry runs against fixtures.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::Value;
use streamsync_core::ProcessConfig;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::merge::deep_merge;
use crate::service::ProcessService;
use crate::types::ObservedProcess;

/// A call received by `InMemoryProcessService`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    List,
    Create(String),
    Replace(String),
    Delete(String),
}

#[derive(Debug, Default)]
struct State {
    processes: Vec<ObservedProcess>,
    calls: Vec<ServiceCall>,
    fail_listing: bool,
    failing_ids: BTreeSet<String>,
}

/// Process service holding processes in memory.
///
/// Behaves like core for the four operations the reconciler uses, records
/// every call, and can be told to fail listing or mutations of given ids.
/// Duplicate ids can be seeded with `with_process` to model a core that
/// already holds them; `create_process` itself refuses duplicates.
#[derive(Debug, Default)]
pub struct InMemoryProcessService {
    state: Mutex<State>,
    server_fields: Option<Value>,
}

impl InMemoryProcessService {
    /// Create an empty service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a process as if core already held it.
    pub fn with_process(mut self, process: ObservedProcess) -> Self {
        self.state.get_mut().processes.push(process);
        self
    }

    /// Fields core adds to every stored config, such as runtime defaults.
    pub fn with_server_fields(mut self, fields: Value) -> Self {
        self.server_fields = Some(fields);
        self
    }

    /// Make `list_processes` fail until reset.
    pub async fn fail_listing(&self, fail: bool) {
        self.state.lock().await.fail_listing = fail;
    }

    /// Make every mutation of `id` fail.
    pub async fn fail_mutations_for(&self, id: impl Into<String>) {
        self.state.lock().await.failing_ids.insert(id.into());
    }

    /// Snapshot of the stored processes.
    pub async fn processes(&self) -> Vec<ObservedProcess> {
        self.state.lock().await.processes.clone()
    }

    /// Calls received so far.
    pub async fn calls(&self) -> Vec<ServiceCall> {
        self.state.lock().await.calls.clone()
    }

    /// Mutating calls received so far.
    pub async fn mutations(&self) -> Vec<ServiceCall> {
        self.calls()
            .await
            .into_iter()
            .filter(|call| *call != ServiceCall::List)
            .collect()
    }

    /// Forget recorded calls.
    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    fn stored(&self, config: &ProcessConfig) -> Result<ObservedProcess> {
        let document = config.to_document()?;
        let document = match &self.server_fields {
            Some(fields) => deep_merge(fields, &document),
            None => document,
        };
        Ok(ObservedProcess::new(
            config.id.as_str(),
            config.reference.as_str(),
            document,
        ))
    }
}

impl State {
    fn check_mutation(&self, id: &str) -> Result<()> {
        if self.failing_ids.contains(id) {
            return Err(Error::service_unavailable(format!(
                "injected failure for process '{id}'"
            )));
        }
        Ok(())
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.processes.iter().position(|p| p.id == id)
    }
}

#[async_trait]
impl ProcessService for InMemoryProcessService {
    async fn list_processes(&self) -> Result<Vec<ObservedProcess>> {
        let mut state = self.state.lock().await;
        state.calls.push(ServiceCall::List);
        if state.fail_listing {
            return Err(Error::service_unavailable("injected listing failure"));
        }
        Ok(state.processes.clone())
    }

    async fn create_process(&self, config: &ProcessConfig) -> Result<()> {
        let id = config.id.as_str();
        let mut state = self.state.lock().await;
        state.calls.push(ServiceCall::Create(id.to_string()));
        state.check_mutation(id)?;
        if state.position(id).is_some() {
            return Err(Error::rejected(id, "a process with this id already exists"));
        }
        let process = self.stored(config)?;
        state.processes.push(process);
        Ok(())
    }

    async fn replace_process(&self, id: &str, config: &ProcessConfig) -> Result<()> {
        let mut state = self.state.lock().await;
        state.calls.push(ServiceCall::Replace(id.to_string()));
        state.check_mutation(id)?;
        let index = state
            .position(id)
            .ok_or_else(|| Error::process_not_found(id))?;
        let process = self.stored(config)?;
        if let Some(slot) = state.processes.get_mut(index) {
            *slot = process;
        }
        Ok(())
    }

    async fn delete_process(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.calls.push(ServiceCall::Delete(id.to_string()));
        state.check_mutation(id)?;
        let index = state
            .position(id)
            .ok_or_else(|| Error::process_not_found(id))?;
        state.processes.remove(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use streamsync_core::{ProcessIo, ProcessLimits, StreamId};

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    fn config(id: &str) -> std::result::Result<ProcessConfig, streamsync_core::Error> {
        Ok(ProcessConfig {
            id: StreamId::new(id)?,
            kind: "ffmpeg".to_string(),
            reference: "streamfile".to_string(),
            input: vec![ProcessIo::new("0", "rtsp://cam", ["-re"])],
            output: vec![],
            options: vec![],
            reconnect: true,
            reconnect_delay_seconds: 2,
            autostart: true,
            stale_timeout_seconds: 20,
            limits: ProcessLimits::disabled(),
        })
    }

    #[tokio::test]
    async fn test_create_then_list() -> TestResult {
        let service = InMemoryProcessService::new();
        service.create_process(&config("cam")?).await?;

        let listed = service.list_processes().await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed.first().map(|p| p.reference.as_str()), Some("streamfile"));
        assert_eq!(
            service.calls().await,
            vec![ServiceCall::Create("cam".to_string()), ServiceCall::List]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_create_is_rejected() -> TestResult {
        let service = InMemoryProcessService::new();
        service.create_process(&config("cam")?).await?;

        let result = service.create_process(&config("cam")?).await;
        assert!(matches!(result, Err(Error::Rejected { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_process_is_not_found() -> TestResult {
        let service = InMemoryProcessService::new();

        let replace = service.replace_process("cam", &config("cam")?).await;
        let delete = service.delete_process("cam").await;

        assert!(matches!(replace, Err(Error::ProcessNotFound { .. })));
        assert!(matches!(delete, Err(Error::ProcessNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_server_fields_are_added_to_stored_config() -> TestResult {
        let service =
            InMemoryProcessService::new().with_server_fields(json!({"runr": true, "limits": {"extra": 1}}));
        service.create_process(&config("cam")?).await?;

        let stored = service.processes().await;
        let document = stored.first().map(|p| p.config.clone()).unwrap_or_default();
        assert_eq!(document.get("runr"), Some(&json!(true)));
        assert_eq!(document.pointer("/limits/extra"), Some(&json!(1)));
        assert_eq!(document.pointer("/limits/cpu_usage"), Some(&json!(0)));
        Ok(())
    }

    #[tokio::test]
    async fn test_injected_failures() -> TestResult {
        let service = InMemoryProcessService::new();
        service.fail_listing(true).await;
        service.fail_mutations_for("cam").await;

        assert!(service.list_processes().await.is_err());
        assert!(service.create_process(&config("cam")?).await.is_err());
        assert!(service.create_process(&config("other")?).await.is_ok());

        service.fail_listing(false).await;
        assert_eq!(service.list_processes().await?.len(), 1);
        Ok(())
    }
}
