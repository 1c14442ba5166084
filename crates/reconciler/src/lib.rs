//! Reconciliation loop that keeps core processes in step with stream files.
//!
//! Each `<id>.stream` file in a folder declares one or more source addresses.
//! Every cycle the loop:
//!
//! 1. Lists the processes core currently holds (observed state)
//! 2. Re-reads the folder and builds one process config per stream (desired state)
//! 3. Diffs the two, restricted to processes carrying this instance's reference tag
//! 4. Applies creates and updates, then deletes, one call at a time
//!
//! A process counts as up to date when merging the desired config over the
//! stored one changes nothing, so fields core adds on its own never look like
//! drift.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use streamsync_client::{CoreClient, CoreConfig};
//! use streamsync_reconciler::{
//!     CoreProcessService, LoopConfig, ProcessTemplate, ReconcilerBuilder,
//!     ReconciliationLoop, StreamfileProvider,
//! };
//!
//! let client = CoreClient::new(CoreConfig::from_address("http://core:8080")?)?;
//! client.login().await?;
//!
//! let reconciler = ReconcilerBuilder::new()
//!     .with_service(Arc::new(CoreProcessService::new(client)))
//!     .reference("streamfile")
//!     .build()?;
//! let template = ProcessTemplate::new("streamfile", "hls,srt".parse()?, "live");
//! let provider = StreamfileProvider::new("./streamfiles", template);
//!
//! let mut loop_runner =
//!     ReconciliationLoop::new(Arc::new(reconciler), Arc::new(provider), LoopConfig::default());
//! loop_runner.run().await;
//! ```

#![forbid(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod descriptor;
pub mod desired;
pub mod error;
pub mod r#loop;
pub mod memory;
pub mod merge;
pub mod output;
pub mod reconciler;
pub mod service;
pub mod types;

// Re-export main types
pub use descriptor::{Descriptor, load_descriptors};
pub use desired::{ProcessTemplate, StreamfileProvider};
pub use error::{Error, Result};
pub use memory::{InMemoryProcessService, ServiceCall};
pub use merge::{deep_merge, is_up_to_date};
pub use output::{OutputPlan, OutputProtocol, ProtocolSet};
pub use r#loop::{
    CycleOutcome, CycleStage, DesiredStateProvider, InMemoryDesiredStateProvider, LoopConfig,
    LoopStopper, ReconciliationLoop,
};
pub use reconciler::{Reconciler, ReconcilerBuilder, ReconcilerConfig};
pub use service::{CoreProcessService, ProcessService};
pub use types::{
    Conflict, DesiredState, ObservedProcess, ObservedState, Plan, ReconcileAction, ReconcileResult,
};
