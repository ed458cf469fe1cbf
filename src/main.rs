//! # ceph-client
//!
//! Reconciles `CephClient` manifests against a cluster's authentication
//! store using the `ceph auth` CLI.
//!
//! ## Startup
//!
//! 1. **Tracing** - `RUST_LOG` filter, `info` by default
//! 2. **Configuration** - defaults, optional TOML file, `CEPH_CLIENT_*` env vars
//! 3. **Command** - validate, apply or delete a manifest

#![forbid(unsafe_code)]
#![forbid(clippy::unwrap_used)]
#![forbid(clippy::panic)]
#![deny(clippy::expect_used)]

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use ceph_client::cli::Cli;
use ceph_client::commands::execute_command;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = ceph_client_core::load_config(cli.config.as_deref())
        .context("Failed to load configuration")?;

    info!(
        binary = %config.ceph.binary,
        max_concurrent = config.reconciler.max_concurrent,
        "Configuration loaded"
    );

    execute_command(cli.command, config).await
}

/// Initialize tracing subscriber with environment filter.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
