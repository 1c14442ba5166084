//! Continuous reconciliation loop.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, watch};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::reconciler::Reconciler;
use crate::types::{DesiredState, ReconcileResult};

/// Default pause between cycles.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Configuration for the reconciliation loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopConfig {
    /// Pause between the end of one cycle and the start of the next.
    pub interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
        }
    }
}

/// State provider trait for getting desired state.
#[async_trait::async_trait]
pub trait DesiredStateProvider: Send + Sync {
    /// Get the current desired state.
    async fn get_desired_state(&self) -> Result<DesiredState>;
}

/// Simple in-memory desired state provider.
pub struct InMemoryDesiredStateProvider {
    state: RwLock<DesiredState>,
}

impl InMemoryDesiredStateProvider {
    /// Create a new provider with initial state.
    pub fn new(state: DesiredState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// Replace the desired state.
    pub async fn update(&self, state: DesiredState) {
        *self.state.write().await = state;
    }
}

#[async_trait::async_trait]
impl DesiredStateProvider for InMemoryDesiredStateProvider {
    async fn get_desired_state(&self) -> Result<DesiredState> {
        Ok(self.state.read().await.clone())
    }
}

/// Step of a cycle that can abandon it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    FetchObserved,
    AssembleDesired,
    Reconcile,
}

impl fmt::Display for CycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchObserved => write!(f, "fetch observed state"),
            Self::AssembleDesired => write!(f, "assemble desired state"),
            Self::Reconcile => write!(f, "reconcile"),
        }
    }
}

/// What one cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing to do.
    Converged { processes: usize },
    /// Actions were planned; counts per disposition.
    Applied {
        applied: usize,
        failed: usize,
        skipped: usize,
        conflicts: usize,
    },
    /// The cycle was abandoned.
    Failed {
        stage: CycleStage,
        reason: String,
        transient: bool,
    },
}

impl CycleOutcome {
    fn from_result(result: &ReconcileResult) -> Self {
        if result.converged {
            Self::Converged {
                processes: result.unchanged,
            }
        } else {
            Self::Applied {
                applied: result.actions_taken.len(),
                failed: result.actions_failed.len(),
                skipped: result.actions_skipped.len(),
                conflicts: result.conflicts.len(),
            }
        }
    }

    fn failed(stage: CycleStage, error: &crate::error::Error) -> Self {
        Self::Failed {
            stage,
            reason: error.to_string(),
            transient: error.is_transient(),
        }
    }

    /// Whether the cycle was abandoned.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Emit the outcome at a level matching its severity.
    pub fn log(&self) {
        match self {
            Self::Converged { processes } => debug!(processes, "Cycle converged"),
            Self::Applied {
                applied,
                failed,
                skipped,
                conflicts,
            } => {
                if *failed > 0 || *conflicts > 0 {
                    warn!(applied, failed, skipped, conflicts, "Cycle finished with problems");
                } else {
                    info!(applied, skipped, "Cycle applied changes");
                }
            }
            Self::Failed {
                stage,
                reason,
                transient,
            } => error!(%stage, %reason, transient, "Cycle failed, retrying next interval"),
        }
    }
}

/// Continuous reconciliation loop.
///
/// Each cycle fetches observed state, assembles desired state, and
/// reconciles the difference. A failed cycle is logged and the loop keeps
/// going; only the stop signal ends it, and only between cycles.
pub struct ReconciliationLoop {
    /// The reconciler.
    reconciler: Arc<Reconciler>,
    /// Desired state provider.
    desired_provider: Arc<dyn DesiredStateProvider>,
    /// Loop configuration.
    config: LoopConfig,
    /// Stop signal receiver.
    stop_rx: watch::Receiver<bool>,
    /// Stop signal sender (for external control).
    stop_tx: watch::Sender<bool>,
}

impl ReconciliationLoop {
    /// Create a new reconciliation loop.
    pub fn new(
        reconciler: Arc<Reconciler>,
        desired_provider: Arc<dyn DesiredStateProvider>,
        config: LoopConfig,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            reconciler,
            desired_provider,
            config,
            stop_rx,
            stop_tx,
        }
    }

    /// Run until stopped.
    pub async fn run(&mut self) {
        info!(
            interval_secs = self.config.interval.as_secs_f64(),
            reference = %self.reconciler.config().reference,
            dry_run = self.reconciler.config().dry_run,
            "Starting reconciliation loop"
        );

        loop {
            if *self.stop_rx.borrow_and_update() {
                break;
            }

            self.run_cycle().await.log();

            tokio::select! {
                () = tokio::time::sleep(self.config.interval) => {}
                changed = self.stop_rx.changed() => {
                    if changed.is_err() || *self.stop_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Reconciliation loop stopped");
    }

    /// Run a single reconciliation cycle.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let observed = match self.reconciler.fetch_observed().await {
            Ok(observed) => observed,
            Err(e) => return CycleOutcome::failed(CycleStage::FetchObserved, &e),
        };

        let desired = match self.desired_provider.get_desired_state().await {
            Ok(desired) => desired,
            Err(e) => return CycleOutcome::failed(CycleStage::AssembleDesired, &e),
        };

        match self.reconciler.reconcile(&desired, &observed).await {
            Ok(result) => CycleOutcome::from_result(&result),
            Err(e) => CycleOutcome::failed(CycleStage::Reconcile, &e),
        }
    }

    /// Stop the loop.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Get a stopper handle.
    pub fn stopper(&self) -> LoopStopper {
        LoopStopper {
            stop_tx: self.stop_tx.clone(),
        }
    }
}

/// Handle to stop a reconciliation loop.
#[derive(Clone)]
pub struct LoopStopper {
    stop_tx: watch::Sender<bool>,
}

impl LoopStopper {
    /// Stop the loop.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryProcessService, ServiceCall};
    use crate::reconciler::ReconcilerConfig;
    use crate::types::ObservedProcess;
    use serde_json::json;
    use streamsync_core::{ProcessConfig, ProcessIo, ProcessLimits, StreamId};

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    struct FailingProvider;

    #[async_trait::async_trait]
    impl DesiredStateProvider for FailingProvider {
        async fn get_desired_state(&self) -> Result<DesiredState> {
            Err(streamsync_core::Error::directory_read_failed("/streams", "permission denied").into())
        }
    }

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

    fn setup(
        desired: DesiredState,
        interval: Duration,
    ) -> (ReconciliationLoop, Arc<InMemoryProcessService>) {
        let service = Arc::new(InMemoryProcessService::new());
        let reconciler = Arc::new(Reconciler::new(service.clone(), ReconcilerConfig::default()));
        let provider = Arc::new(InMemoryDesiredStateProvider::new(desired));
        let loop_runner = ReconciliationLoop::new(reconciler, provider, LoopConfig { interval });
        (loop_runner, service)
    }

    /// Given an empty system
    /// When the loop runs one cycle
    /// Then it should report converged
    #[tokio::test]
    async fn empty_system_is_converged() {
        let (loop_runner, _) = setup(DesiredState::new(), DEFAULT_INTERVAL);

        let outcome = loop_runner.run_cycle().await;

        assert_eq!(outcome, CycleOutcome::Converged { processes: 0 });
    }

    /// Given a desired state with one process
    /// And an empty core
    /// When the loop runs two cycles
    /// Then the first applies a create and the second is converged
    #[tokio::test]
    async fn missing_process_is_created_then_converges() -> TestResult {
        let desired: DesiredState = [config("cam")?].into_iter().collect();
        let (loop_runner, _) = setup(desired, DEFAULT_INTERVAL);

        assert_eq!(
            loop_runner.run_cycle().await,
            CycleOutcome::Applied {
                applied: 1,
                failed: 0,
                skipped: 0,
                conflicts: 0
            }
        );
        assert_eq!(
            loop_runner.run_cycle().await,
            CycleOutcome::Converged { processes: 1 }
        );
        Ok(())
    }

    /// Given core cannot be listed
    /// When a cycle runs
    /// Then it fails at the fetch stage and issues no mutating call
    /// And the next cycle, once core is back, does the work
    #[tokio::test]
    async fn failed_fetch_abandons_only_that_cycle() -> TestResult {
        let desired: DesiredState = [config("cam")?].into_iter().collect();
        let (loop_runner, service) = setup(desired, DEFAULT_INTERVAL);
        service.fail_listing(true).await;

        let outcome = loop_runner.run_cycle().await;

        assert!(outcome.is_failure());
        assert!(matches!(
            outcome,
            CycleOutcome::Failed { stage: CycleStage::FetchObserved, transient: true, .. }
        ));
        assert_eq!(service.calls().await, vec![ServiceCall::List]);

        service.fail_listing(false).await;
        assert!(!loop_runner.run_cycle().await.is_failure());
        assert_eq!(service.mutations().await, vec![ServiceCall::Create("cam".to_string())]);
        Ok(())
    }

    /// Given the stream folder cannot be read
    /// When a cycle runs
    /// Then nothing is deleted
    #[tokio::test]
    async fn unreadable_folder_does_not_delete_everything() {
        let service = Arc::new(
            InMemoryProcessService::new()
                .with_process(ObservedProcess::new("cam", "streamfile", json!({}))),
        );
        let reconciler = Arc::new(Reconciler::new(service.clone(), ReconcilerConfig::default()));
        let loop_runner =
            ReconciliationLoop::new(reconciler, Arc::new(FailingProvider), LoopConfig::default());

        let outcome = loop_runner.run_cycle().await;

        assert!(matches!(
            outcome,
            CycleOutcome::Failed { stage: CycleStage::AssembleDesired, .. }
        ));
        assert!(service.mutations().await.is_empty());
        assert_eq!(service.processes().await.len(), 1);
    }

    /// Given a loop whose cycles keep failing
    /// When it runs for several intervals
    /// Then it keeps attempting cycles until stopped
    #[tokio::test(start_paused = true)]
    async fn loop_survives_failing_cycles() {
        let (mut loop_runner, service) = setup(DesiredState::new(), Duration::from_millis(10));
        service.fail_listing(true).await;
        let stopper = loop_runner.stopper();

        let handle = tokio::spawn(async move { loop_runner.run().await });
        tokio::time::sleep(Duration::from_millis(35)).await;
        stopper.stop();

        let result = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(result.is_ok_and(|joined| joined.is_ok()));
        assert!(service.calls().await.len() >= 3);
    }

    /// Given a loop that is running
    /// When stop() is called
    /// Then the loop should exit gracefully
    #[tokio::test]
    async fn stop_signal_terminates_loop() {
        let (mut loop_runner, _) = setup(DesiredState::new(), Duration::from_secs(3600));
        let stopper = loop_runner.stopper();

        let handle = tokio::spawn(async move { loop_runner.run().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        stopper.stop();

        let result = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(result.is_ok(), "Loop should stop within timeout");
        assert!(result.ok().is_some_and(|joined| joined.is_ok()));
    }

    /// Given a desired state provider
    /// When update() is called
    /// Then subsequent calls to get_desired_state() should reflect changes
    #[tokio::test]
    async fn desired_state_provider_reflects_updates() -> TestResult {
        let provider = InMemoryDesiredStateProvider::new(DesiredState::new());
        assert!(provider.get_desired_state().await?.is_empty());

        provider.update([config("cam")?].into_iter().collect()).await;

        assert_eq!(provider.get_desired_state().await?.len(), 1);
        Ok(())
    }
}
