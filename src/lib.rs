#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # ceph-client
//!
//! Command-line front end for the Ceph client reconciler.
//!
//! This library re-exports the workspace crates for convenience.

// Re-export all crates
pub use ceph_client_core;
pub use ceph_client_reconciler;

pub mod cli;
pub mod commands;
