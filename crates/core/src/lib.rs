//! Core configuration and error types shared by the Ceph client workspace.

#![forbid(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod config;
pub mod error;

pub use config::{CephConfig, Config, ReconcilerConfig, load_config};
pub use error::{Error, Result};
