//! Core types for the reconciler.

use std::collections::BTreeMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use streamsync_core::{ProcessConfig, StreamId};

/// Desired state: one process config per stream id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredState {
    /// Processes that should exist, keyed by identity.
    pub processes: BTreeMap<StreamId, ProcessConfig>,
}

impl DesiredState {
    /// Create a new empty desired state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a process. A later entry with the same id replaces the earlier one.
    ///
    /// Returns the replaced config, if any.
    pub fn insert(&mut self, config: ProcessConfig) -> Option<ProcessConfig> {
        self.processes.insert(config.id.clone(), config)
    }

    /// Get a process config.
    pub fn get(&self, id: &str) -> Option<&ProcessConfig> {
        self.processes.get(id)
    }

    /// Whether a process with this id is desired.
    pub fn contains(&self, id: &str) -> bool {
        self.processes.contains_key(id)
    }

    /// Get the number of processes.
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    /// Check if the desired state is empty.
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

impl FromIterator<ProcessConfig> for DesiredState {
    fn from_iter<I: IntoIterator<Item = ProcessConfig>>(iter: I) -> Self {
        let mut state = Self::new();
        for config in iter {
            state.insert(config);
        }
        state
    }
}

/// A process as reported by the process service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedProcess {
    pub id: String,
    pub reference: String,
    /// Stored configuration, including fields this tool never sets.
    pub config: serde_json::Value,
}

impl ObservedProcess {
    /// Create an observed process record.
    pub fn new(
        id: impl Into<String>,
        reference: impl Into<String>,
        config: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            reference: reference.into(),
            config,
        }
    }
}

/// Observed state: everything the process service listed.
#[derive(Debug, Clone, Default)]
pub struct ObservedState {
    pub processes: Vec<ObservedProcess>,
}

impl ObservedState {
    /// Create a new empty observed state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a process listing.
    pub fn from_processes(processes: Vec<ObservedProcess>) -> Self {
        Self { processes }
    }

    /// Processes carrying `reference`, grouped by id.
    ///
    /// More than one entry under an id means core holds duplicates.
    pub fn owned_by(&self, reference: &str) -> BTreeMap<&str, Vec<&ObservedProcess>> {
        self.processes
            .iter()
            .filter(|p| p.reference == reference)
            .map(|p| (p.id.as_str(), p))
            .into_group_map()
            .into_iter()
            .collect()
    }

    /// Get the number of listed processes.
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    /// Check if nothing was listed.
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

/// Actions the reconciler can take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReconcileAction {
    /// Create a new process.
    Create { config: ProcessConfig },
    /// Replace the config of an existing process.
    Update { id: String, config: ProcessConfig },
    /// Delete a process that no longer has a stream file.
    Delete { id: String },
}

impl ReconcileAction {
    /// Get the process id this action targets.
    pub fn id(&self) -> &str {
        match self {
            Self::Create { config } => config.id.as_str(),
            Self::Update { id, .. } | Self::Delete { id } => id,
        }
    }

    /// Get a description of the action.
    pub fn description(&self) -> String {
        match self {
            Self::Create { config } => format!("create process {}", config.id),
            Self::Update { id, .. } => format!("update process {id}"),
            Self::Delete { id } => format!("delete process {id}"),
        }
    }
}

/// Several owned processes share one id; none of them is touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub id: String,
    pub count: usize,
}

/// Outcome of diffing desired against observed state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    /// Creates and updates first, deletes last.
    pub actions: Vec<ReconcileAction>,
    /// Duplicate observed ids left alone this cycle.
    pub conflicts: Vec<Conflict>,
    /// Desired processes already up to date.
    pub unchanged: usize,
}

impl Plan {
    /// Whether nothing needs doing.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.conflicts.is_empty()
    }
}

/// Result of reconciliation.
#[derive(Debug, Clone)]
pub struct ReconcileResult {
    /// Actions that were taken.
    pub actions_taken: Vec<ReconcileAction>,
    /// Actions that failed.
    pub actions_failed: Vec<(ReconcileAction, String)>,
    /// Actions planned but not sent (dry run).
    pub actions_skipped: Vec<ReconcileAction>,
    /// Duplicate observed ids.
    pub conflicts: Vec<Conflict>,
    /// Processes already up to date.
    pub unchanged: usize,
    /// Number of processes in desired state.
    pub desired_count: usize,
    /// Number of processes in observed state.
    pub observed_count: usize,
    /// Whether the system is converged.
    pub converged: bool,
}

impl ReconcileResult {
    /// Create a new reconcile result.
    pub fn new(
        actions_taken: Vec<ReconcileAction>,
        actions_failed: Vec<(ReconcileAction, String)>,
        actions_skipped: Vec<ReconcileAction>,
        plan_extras: (Vec<Conflict>, usize),
        counts: (usize, usize),
    ) -> Self {
        let (conflicts, unchanged) = plan_extras;
        let (desired_count, observed_count) = counts;
        let converged = actions_taken.is_empty()
            && actions_failed.is_empty()
            && actions_skipped.is_empty()
            && conflicts.is_empty();
        Self {
            actions_taken,
            actions_failed,
            actions_skipped,
            conflicts,
            unchanged,
            desired_count,
            observed_count,
            converged,
        }
    }

    /// Check if all actions succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.actions_failed.is_empty()
    }
}
