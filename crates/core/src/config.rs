//! Configuration loading and management
//!
//! # Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Config file passed on the command line (optional)
//! 3. Environment variables: `CEPH_CLIENT_*`
//!
//! # Example Config
//!
//! ```toml
//! [ceph]
//! binary = "ceph"
//! config_dir = "/var/lib/rook"
//! admin_user = "client.admin"
//! command_timeout_secs = 15
//!
//! [reconciler]
//! max_concurrent = 5
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const MAX_COMMAND_TIMEOUT_SECS: u64 = 600;

// ═══════════════════════════════════════════════════════════════════════════
// CONFIGURATION STRUCTURES
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub ceph: CephConfig,
    pub reconciler: ReconcilerConfig,
}

/// How to reach the cluster's authentication store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CephConfig {
    /// Name or path of the `ceph` binary.
    pub binary: String,
    /// Directory holding `<namespace>/<namespace>.config` and admin keyrings.
    pub config_dir: PathBuf,
    /// Entity the commands authenticate as.
    pub admin_user: String,
    /// Upper bound on a single command's runtime.
    pub command_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Maximum number of identities reconciled at once.
    pub max_concurrent: usize,
}

// ═══════════════════════════════════════════════════════════════════════════
// DEFAULT IMPLEMENTATIONS
// ═══════════════════════════════════════════════════════════════════════════

impl Default for CephConfig {
    fn default() -> Self {
        Self {
            binary: "ceph".to_string(),
            config_dir: PathBuf::from("/var/lib/rook"),
            admin_user: "client.admin".to_string(),
            command_timeout_secs: 15,
        }
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self { max_concurrent: 5 }
    }
}

impl CephConfig {
    /// Cluster selection arguments appended to every command for `namespace`.
    #[must_use]
    pub fn cluster_args(&self, namespace: &str) -> Vec<String> {
        let cluster_dir = self.config_dir.join(namespace);
        vec![
            format!("--cluster={namespace}"),
            format!(
                "--conf={}",
                cluster_dir.join(format!("{namespace}.config")).display()
            ),
            format!("--name={}", self.admin_user),
            format!(
                "--keyring={}",
                cluster_dir
                    .join(format!("{}.keyring", self.admin_user))
                    .display()
            ),
            "--format".to_string(),
            "json".to_string(),
        ]
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// LOADING
// ═══════════════════════════════════════════════════════════════════════════

/// Load configuration from all sources with hierarchy
///
/// # Errors
///
/// Returns error if:
/// - The config file cannot be read or is malformed TOML
/// - An environment variable holds an unparsable value
/// - Config values fail validation
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => load_toml_file(path)?,
        None => Config::default(),
    };

    config.apply_env(|key| std::env::var(key).ok())?;
    config.validate()?;

    Ok(config)
}

/// Load a TOML file; missing keys fall back to defaults.
///
/// # Errors
///
/// Returns error if the file cannot be read or the TOML is malformed
fn load_toml_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::file_read_failed(path, e.to_string()))?;

    toml::from_str(&content).map_err(|e| Error::toml_parse_failed(path, e.to_string()))
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| Error::invalid_env_value(key, e.to_string()))
}

impl Config {
    /// Apply environment variable overrides
    ///
    /// # Errors
    ///
    /// Returns error if environment variable values are invalid
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup("CEPH_CLIENT_BINARY") {
            self.ceph.binary = value;
        }

        if let Some(value) = lookup("CEPH_CLIENT_CONFIG_DIR") {
            self.ceph.config_dir = PathBuf::from(value);
        }

        if let Some(value) = lookup("CEPH_CLIENT_ADMIN_USER") {
            self.ceph.admin_user = value;
        }

        if let Some(value) = lookup("CEPH_CLIENT_COMMAND_TIMEOUT_SECS") {
            self.ceph.command_timeout_secs =
                parse_env("CEPH_CLIENT_COMMAND_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = lookup("CEPH_CLIENT_MAX_CONCURRENT") {
            self.reconciler.max_concurrent = parse_env("CEPH_CLIENT_MAX_CONCURRENT", &value)?;
        }

        Ok(())
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any values are out of range or invalid
    pub fn validate(&self) -> Result<()> {
        if self.ceph.binary.trim().is_empty() {
            return Err(Error::invalid_config("ceph.binary cannot be empty"));
        }

        if self.ceph.admin_user.trim().is_empty() {
            return Err(Error::invalid_config("ceph.admin_user cannot be empty"));
        }

        if self.ceph.command_timeout_secs == 0
            || self.ceph.command_timeout_secs > MAX_COMMAND_TIMEOUT_SECS
        {
            return Err(Error::invalid_config(format!(
                "ceph.command_timeout_secs must be 1-{MAX_COMMAND_TIMEOUT_SECS}"
            )));
        }

        if self.reconciler.max_concurrent == 0 {
            return Err(Error::invalid_config(
                "reconciler.max_concurrent must be at least 1",
            ));
        }

        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════
