// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;
pub mod watch;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, WatchConfig};
use crate::engine::{Supervisor, SupervisorStats};
use crate::exec::{CommandRunner, ProcessRunner};
use crate::fs::RealFileSystem;
use crate::watch::{notification_channel, ChangeDetector, PollingDetector};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - Ctrl-C handling
/// - the polling change detector (background task)
/// - the process supervisor (foreground)
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args).context("invalid configuration")?;

    let cancel = CancellationToken::new();

    // Ctrl-C → graceful shutdown.
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("interrupt received; shutting down");
            cancel.cancel();
        });
    }

    let detector = PollingDetector::from_config(&cfg, Arc::new(RealFileSystem));
    let runner = ProcessRunner::from_config(&cfg);
    run_with(&cfg, detector, runner, cancel).await?;
    Ok(())
}

/// Run one detector and one supervisor until `cancel` fires.
///
/// The detector is primed before anything is launched; a failing first walk
/// is returned as an error. A detector that fails later closes the
/// notification channel, which stops the supervisor, and its error is
/// returned once the child is gone.
pub async fn run_with<D, R>(
    cfg: &WatchConfig,
    mut detector: D,
    runner: R,
    cancel: CancellationToken,
) -> Result<SupervisorStats>
where
    D: ChangeDetector,
    R: CommandRunner,
{
    let watched = detector.prime()?;
    info!(root = ?cfg.root, entries = watched, cmd = %cfg.command, "watching");

    let (notifier, notify_rx) = notification_channel();
    if cfg.initial_run {
        notifier.post();
    }

    let detector_handle = tokio::spawn(detector.run(cancel.clone(), notifier));

    let supervisor = Supervisor::new(runner, cfg.command.clone(), cfg.stop_timeout);
    let stats = supervisor.run(cancel.clone(), notify_rx).await;

    // The supervisor only returns on cancellation or once the detector has
    // dropped its sender; either way the detector is done or about to be.
    cancel.cancel();
    detector_handle
        .await
        .context("change detector task panicked")?
        .context("change detector failed")?;

    Ok(stats)
}
