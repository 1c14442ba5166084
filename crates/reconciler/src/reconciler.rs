//! Reconciler implementation.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::merge::is_up_to_date;
use crate::service::ProcessService;
use crate::types::{Conflict, DesiredState, ObservedState, Plan, ReconcileAction, ReconcileResult};

/// Default ownership tag.
pub const DEFAULT_REFERENCE: &str = "streamfile";

/// Configuration for the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Only processes carrying this tag are updated or deleted.
    pub reference: String,
    /// Plan and log without calling the process service.
    pub dry_run: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            reference: DEFAULT_REFERENCE.to_string(),
            dry_run: false,
        }
    }
}

/// Drives the process service toward the desired state.
pub struct Reconciler {
    /// Remote side.
    service: Arc<dyn ProcessService>,
    /// Configuration.
    config: ReconcilerConfig,
}

impl Reconciler {
    /// Create a new reconciler.
    pub fn new(service: Arc<dyn ProcessService>, config: ReconcilerConfig) -> Self {
        Self { service, config }
    }

    /// List the processes the service currently holds.
    ///
    /// # Errors
    ///
    /// Propagates the service error; the caller abandons the cycle.
    pub async fn fetch_observed(&self) -> Result<ObservedState> {
        let processes = self.service.list_processes().await?;
        Ok(ObservedState::from_processes(processes))
    }

    /// Compute the actions that move `observed` toward `desired`.
    ///
    /// Only processes tagged with this reconciler's reference are considered.
    /// An id held more than once under that tag is reported as a conflict and
    /// left alone. Creates and updates come first, then deletes; each group is
    /// ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if a desired config cannot be rendered as a document.
    pub fn plan(&self, desired: &DesiredState, observed: &ObservedState) -> Result<Plan> {
        let owned = observed.owned_by(&self.config.reference);
        let mut plan = Plan::default();

        for (id, processes) in &owned {
            if processes.len() > 1 {
                error!(
                    id = %id,
                    count = processes.len(),
                    reference = %self.config.reference,
                    "Duplicate process id in core, leaving it alone this cycle"
                );
                plan.conflicts.push(Conflict {
                    id: (*id).to_string(),
                    count: processes.len(),
                });
            }
        }

        for (id, config) in &desired.processes {
            match owned.get(id.as_str()).map(Vec::as_slice) {
                None | Some([]) => plan.actions.push(ReconcileAction::Create {
                    config: config.clone(),
                }),
                Some([current]) => {
                    if is_up_to_date(&current.config, &config.to_document()?) {
                        plan.unchanged += 1;
                    } else {
                        plan.actions.push(ReconcileAction::Update {
                            id: id.to_string(),
                            config: config.clone(),
                        });
                    }
                }
                Some(_) => {}
            }
        }

        plan.actions.extend(
            owned
                .iter()
                .filter(|(id, processes)| processes.len() == 1 && !desired.contains(id))
                .map(|(id, _)| ReconcileAction::Delete {
                    id: (*id).to_string(),
                }),
        );

        debug!(
            actions = plan.actions.len(),
            conflicts = plan.conflicts.len(),
            unchanged = plan.unchanged,
            "Computed plan"
        );
        Ok(plan)
    }

    /// Core reconciliation: compare desired vs observed and apply the diff.
    ///
    /// Individual action failures are recorded in the result and never stop
    /// the remaining actions.
    ///
    /// # Errors
    ///
    /// Returns an error only when the plan itself cannot be computed.
    pub async fn reconcile(
        &self,
        desired: &DesiredState,
        observed: &ObservedState,
    ) -> Result<ReconcileResult> {
        debug!(
            desired = desired.len(),
            observed = observed.len(),
            reference = %self.config.reference,
            "Starting reconciliation"
        );

        let plan = self.plan(desired, observed)?;

        let (taken, failed, skipped) = if self.config.dry_run {
            for action in &plan.actions {
                info!(action = %action.description(), "Dry run, not applying");
            }
            (Vec::new(), Vec::new(), plan.actions)
        } else {
            let (taken, failed) = self.apply_actions(plan.actions).await;
            (taken, failed, Vec::new())
        };

        let result = ReconcileResult::new(
            taken,
            failed,
            skipped,
            (plan.conflicts, plan.unchanged),
            (desired.len(), observed.len()),
        );

        if result.converged {
            debug!(processes = result.unchanged, "System converged");
        } else {
            info!(
                actions_taken = result.actions_taken.len(),
                actions_failed = result.actions_failed.len(),
                actions_skipped = result.actions_skipped.len(),
                conflicts = result.conflicts.len(),
                "Reconciliation complete"
            );
        }

        Ok(result)
    }

    /// Apply actions one at a time, in order.
    async fn apply_actions(
        &self,
        actions: Vec<ReconcileAction>,
    ) -> (Vec<ReconcileAction>, Vec<(ReconcileAction, String)>) {
        let mut taken = Vec::new();
        let mut failed = Vec::new();

        for action in actions {
            match self.execute(&action).await {
                Ok(()) => {
                    info!(action = %action.description(), "Applied action");
                    taken.push(action);
                }
                Err(e) => {
                    warn!(action = %action.description(), error = %e, "Action failed");
                    failed.push((action, e.to_string()));
                }
            }
        }

        (taken, failed)
    }

    async fn execute(&self, action: &ReconcileAction) -> Result<()> {
        match action {
            ReconcileAction::Create { config } => self.service.create_process(config).await,
            ReconcileAction::Update { id, config } => {
                self.service.replace_process(id, config).await
            }
            ReconcileAction::Delete { id } => self.service.delete_process(id).await,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }
}

/// Builder for Reconciler.
pub struct ReconcilerBuilder {
    service: Option<Arc<dyn ProcessService>>,
    config: ReconcilerConfig,
}

impl ReconcilerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            service: None,
            config: ReconcilerConfig::default(),
        }
    }

    /// Set the process service.
    pub fn with_service(mut self, service: Arc<dyn ProcessService>) -> Self {
        self.service = Some(service);
        self
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the ownership tag.
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.config.reference = reference.into();
        self
    }

    /// Enable/disable dry run.
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.config.dry_run = enabled;
        self
    }

    /// Build the reconciler.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` without a service or with a blank
    /// reference tag.
    pub fn build(self) -> Result<Reconciler> {
        let service = self
            .service
            .ok_or_else(|| Error::invalid_config("Process service is required"))?;

        if self.config.reference.trim().is_empty() {
            return Err(Error::invalid_config("Reference tag must not be empty"));
        }

        Ok(Reconciler::new(service, self.config))
    }
}

impl Default for ReconcilerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
