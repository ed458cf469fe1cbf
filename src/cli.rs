//! CLI command definitions using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// ceph-client - reconcile CephClient manifests against a cluster
#[derive(Parser, Debug)]
#[command(name = "ceph-client")]
#[command(version)]
#[command(about = "Reconcile CephClient manifests against a Ceph cluster's auth store")]
#[command(
    long_about = "Creates, updates and removes Ceph client credentials so the cluster matches the caps declared in CephClient manifests."
)]
pub struct Cli {
    /// Config file (TOML); env vars CEPH_CLIENT_* override it
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check manifests without contacting the cluster
    Validate {
        /// Manifest file (YAML, may hold several documents)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Create or update the clients declared in a manifest
    Apply {
        /// Manifest file (YAML, may hold several documents)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Remove the clients declared in a manifest
    Delete {
        /// Manifest file (YAML, may hold several documents)
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from(["ceph-client", "--config", "c.toml", "apply", "-f", "m.yaml"]);
        assert!(matches!(
            cli,
            Ok(Cli {
                config: Some(_),
                command: Commands::Apply { .. }
            })
        ));
    }

    #[test]
    fn test_file_is_required() {
        assert!(Cli::try_parse_from(["ceph-client", "delete"]).is_err());
    }
}
