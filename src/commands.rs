//! CLI command handlers.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use ceph_client_core::Config;
use ceph_client_reconciler::{
    CephAuthStore, CephClient, ProcessExecutor, ReconcileReport, ReconcilerBuilder,
    load_manifests, validate,
};
use chrono::Utc;
use tracing::info;

use crate::cli::Commands;

/// Execute a CLI command.
///
/// # Errors
///
/// Returns error if the manifest cannot be loaded or any client fails.
pub async fn execute_command(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Apply { file } => cmd_reconcile(&file, config, false).await,
        Commands::Delete { file } => cmd_reconcile(&file, config, true).await,
    }
}

/// Read and parse a manifest file.
///
/// # Errors
///
/// Returns error if the file cannot be read or parsed.
pub fn load_clients(path: &Path) -> Result<Vec<CephClient>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;
    load_manifests(&content).with_context(|| format!("Invalid manifest {}", path.display()))
}

fn cmd_validate(path: &Path) -> Result<()> {
    let clients = load_clients(path)?;

    let failures = clients
        .iter()
        .filter_map(|client| {
            let identity = client.identity();
            match validate(&client.record()) {
                Ok(()) => {
                    println!("ok      {identity}");
                    None
                }
                Err(e) => {
                    println!("invalid {identity}: {e}");
                    Some(identity)
                }
            }
        })
        .count();

    if failures > 0 {
        bail!("{failures} of {} clients are invalid", clients.len());
    }
    Ok(())
}

async fn cmd_reconcile(path: &Path, config: Config, delete: bool) -> Result<()> {
    let mut clients = load_clients(path)?;
    if delete {
        let now = Utc::now();
        clients = clients.into_iter().map(|client| client.deleting(now)).collect();
    }

    info!(
        manifest = %path.display(),
        clients = clients.len(),
        delete,
        "Reconciling manifest"
    );

    let executor = Arc::new(ProcessExecutor::from_config(&config.ceph));
    let store = Arc::new(CephAuthStore::new(executor, config.ceph));
    let reconciler = ReconcilerBuilder::new()
        .with_store(store)
        .with_config(config.reconciler)
        .build()?;

    let report = reconciler.reconcile_all(&clients).await;
    print_report(&report);

    if !report.all_succeeded() {
        bail!("{} of {} clients failed", report.failed.len(), report.total());
    }
    Ok(())
}

fn print_report(report: &ReconcileReport) {
    for outcome in &report.succeeded {
        let phase = outcome
            .status()
            .map_or_else(|| "Removed".to_string(), |status| format!("{:?}", status.phase));
        println!("{phase:<8} {}", outcome.description());
    }
    for failure in &report.failed {
        println!(
            "{:<8} {}: {}",
            format!("{:?}", failure.status.phase),
            failure.identity,
            failure.reason
        );
    }
}
