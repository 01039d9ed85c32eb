//! Standalone execution (no control plane)
//!
//! Runs exactly one job synchronously, reporting progress through the
//! log instead of a status topic. Ctrl-C cancels the job cooperatively.

use crate::config::Config;
use crate::control::{execute_job, JobMode, JobOutcome};
use crate::crawler::Progress;
use crate::session::SessionFactory;
use crate::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Runs one job and returns its outcome
///
/// A missing prerequisite (product mode without a prior discovery
/// result) surfaces as an error, which the binary maps to a non-zero
/// exit status.
pub async fn run_standalone(
    config: &Config,
    mode: JobMode,
    factory: Arc<dyn SessionFactory>,
) -> Result<JobOutcome> {
    tracing::info!("Standalone mode: running one {} job", mode);

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling job");
            signal_cancel.cancel();
        }
    });

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<Progress>();
    let reporter = tokio::spawn(async move {
        while let Some(progress) = progress_rx.recv().await {
            tracing::info!(
                "Progress: {}/{} pages",
                progress.processed,
                progress.total_estimate
            );
        }
    });

    let outcome = execute_job(config, mode, factory, &cancel, progress_tx).await?;
    let _ = reporter.await;

    match outcome {
        JobOutcome::Completed => tracing::info!("Job completed successfully"),
        JobOutcome::Cancelled => tracing::warn!("Job cancelled before completion"),
    }
    Ok(outcome)
}
