//! K8s-style reconciliation of Ceph client credentials.
//!
//! A `CephClient` object declares a client identity and the caps it should
//! hold on the object store (`osd`), the monitors (`mon`) and the metadata
//! server (`mds`). The reconciler compares that against the cluster's
//! authentication store and converges it:
//!
//! - **Validate**: reject malformed objects before any external call
//! - **Observe**: look up the registered caps, if any
//! - **Diff**: decide whether the registered caps need rewriting
//! - **Act**: create, update, leave alone, or delete
//!
//! The store is reached through the [`AuthStore`] trait. [`CephAuthStore`]
//! drives the `ceph auth` CLI through a [`CommandExecutor`];
//! [`InMemoryAuthStore`] stands in for the cluster in tests.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use ceph_client_core::Config;
//! use ceph_client_reconciler::{
//!     CapabilitySet, CephAuthStore, CephClient, ProcessExecutor, ReconcilerBuilder,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let executor = Arc::new(ProcessExecutor::from_config(&config.ceph));
//!     let store = Arc::new(CephAuthStore::new(executor, config.ceph.clone()));
//!     let reconciler = ReconcilerBuilder::new()
//!         .with_store(store)
//!         .with_config(config.reconciler)
//!         .build()?;
//!
//!     let client = CephClient::new("glance", "rook-ceph", CapabilitySet::uniform("allow r"));
//!     let outcome = reconciler.reconcile(&client).await?;
//!     println!("{}", outcome.description());
//!     Ok(())
//! }
//! ```

#![forbid(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod caps;
pub mod ceph_auth;
pub mod error;
pub mod executor;
pub mod reconciler;
pub mod resource;
pub mod store;
pub mod types;
pub mod validate;

// Re-export main types
pub use caps::{CapabilitySet, Subsystem, changed};
pub use ceph_auth::CephAuthStore;
pub use error::{Error, Result, ValidationError};
pub use executor::{CommandError, CommandExecutor, ProcessExecutor};
pub use reconciler::{Reconciler, ReconcilerBuilder};
pub use resource::{CephClient, ClientPhase, ClientSpec, ClientStatus, ObjectMeta, load_manifests};
pub use store::{AuthStore, InMemoryAuthStore};
pub use types::{
    ClientIdentity, ClientRecord, ReconcileAction, ReconcileFailure, ReconcileOutcome, ReconcileReport,
};
pub use validate::{validate, validate_identity};
