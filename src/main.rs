//! # streamsync
//!
//! ## Startup Sequence
//!
//! 1. **Settings** - Parse flags and environment, validate before any I/O
//! 2. **Login** - Authenticate against core; failure here is fatal
//! 3. **Reconciliation Loop** - Poll the stream folder and converge core
//!
//! ## Shutdown
//!
//! Ctrl+C stops the loop between cycles; an in-flight cycle always finishes.

#![forbid(unsafe_code)]
#![forbid(clippy::unwrap_used)]
#![forbid(clippy::panic)]
#![deny(clippy::expect_used)]

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use streamsync::{Cli, Settings};
use streamsync_client::CoreClient;
use streamsync_reconciler::{
    CoreProcessService, LoopConfig, LoopStopper, ReconcilerBuilder, ReconciliationLoop,
    StreamfileProvider,
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();

    let settings =
        Settings::try_from(Cli::parse()).context("Invalid configuration, refusing to start")?;

    info!(
        core = %settings.core.base_url,
        folder = %settings.folder.display(),
        reference = %settings.reference,
        protocols = %settings.protocols,
        "streamsync starting"
    );

    let client = init_client(&settings).await?;
    let mut loop_runner = init_loop(&settings, client)?;

    if settings.once {
        let outcome = loop_runner.run_cycle().await;
        outcome.log();
        return Ok(if outcome.is_failure() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        });
    }

    tokio::spawn(stop_on_ctrl_c(loop_runner.stopper()));
    loop_runner.run().await;

    info!("streamsync stopped");
    Ok(ExitCode::SUCCESS)
}

/// Initialize tracing subscriber with environment filter.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the core client and log in.
async fn init_client(settings: &Settings) -> Result<CoreClient> {
    let client = CoreClient::new(settings.core.clone()).context("Failed to build core client")?;

    client
        .login()
        .await
        .with_context(|| format!("Login to core at {} failed", settings.core.base_url))?;

    Ok(client)
}

/// Assemble the reconciler, the stream folder provider and the loop.
fn init_loop(settings: &Settings, client: CoreClient) -> Result<ReconciliationLoop> {
    let reconciler = ReconcilerBuilder::new()
        .with_service(Arc::new(CoreProcessService::new(client)))
        .reference(settings.reference.as_str())
        .dry_run(settings.dry_run)
        .build()
        .context("Failed to build reconciler")?;

    let provider = StreamfileProvider::new(settings.folder.clone(), settings.template());

    Ok(ReconciliationLoop::new(
        Arc::new(reconciler),
        Arc::new(provider),
        LoopConfig {
            interval: settings.interval,
        },
    ))
}

/// Wait for Ctrl+C, then stop the loop.
async fn stop_on_ctrl_c(stopper: LoopStopper) {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl+C, stopping after the current cycle");
            stopper.stop();
        }
        Err(err) => error!("Failed to listen for shutdown signal: {}", err),
    }
}
