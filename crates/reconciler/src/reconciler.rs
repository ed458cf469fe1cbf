//! Reconciler implementation.

use std::sync::Arc;

use ceph_client_core::ReconcilerConfig;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use tracing::{debug, info, warn};

use crate::caps::{CapabilitySet, changed};
use crate::error::{Error, Result};
use crate::resource::CephClient;
use crate::store::AuthStore;
use crate::types::{
    ClientIdentity, ClientRecord, ReconcileAction, ReconcileFailure, ReconcileOutcome, ReconcileReport,
};
use crate::validate::{validate, validate_identity};

/// Drives client credentials on the cluster toward their desired state.
///
/// Each identity is handled sequentially: validate, look up, diff, then
/// create, update or leave alone. The store is the only source of observed
/// state; nothing is cached between passes.
pub struct Reconciler {
    store: Arc<dyn AuthStore>,
    config: ReconcilerConfig,
}

impl Reconciler {
    /// Create a new reconciler.
    pub fn new(store: Arc<dyn AuthStore>, config: ReconcilerConfig) -> Self {
        Self { store, config }
    }

    /// Whether a credential for `identity` is registered.
    ///
    /// # Errors
    ///
    /// Only when the store cannot be queried; absence is `Ok(false)`.
    pub async fn exists(&self, identity: &ClientIdentity) -> Result<bool> {
        self.store.exists(identity).await
    }

    /// Register a credential with its full cap set.
    ///
    /// # Errors
    ///
    /// `EmptyCapabilities` before touching the store if any cap is blank;
    /// otherwise whatever the store reports.
    pub async fn create(&self, record: &ClientRecord) -> Result<()> {
        if !record.caps.is_complete() {
            return Err(Error::empty_capabilities(record.identity.entity()));
        }

        info!(client = %record.identity, "Creating client");
        self.store.create(record).await
    }

    /// Rewrite the caps of a registered credential.
    ///
    /// Blank fields of `desired` keep their `observed` value, so an update
    /// never revokes a cap the caller left empty. Returns the caps applied.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn update(
        &self,
        identity: &ClientIdentity,
        observed: &CapabilitySet,
        desired: &CapabilitySet,
    ) -> Result<CapabilitySet> {
        let missing = desired.missing();
        if !missing.is_empty() {
            warn!(
                client = %identity,
                subsystems = %missing.iter().join(","),
                "Desired caps are blank for some subsystems; keeping the caps already granted"
            );
        }

        let applied = desired.merged_over(observed);
        info!(client = %identity, "Updating client caps");
        self.store
            .update(&ClientRecord::new(identity.clone(), applied.clone()))
            .await?;
        Ok(applied)
    }

    /// Remove a credential. Removing an absent one succeeds.
    ///
    /// # Errors
    ///
    /// Propagates store failures other than not-found.
    pub async fn delete(&self, identity: &ClientIdentity) -> Result<()> {
        info!(client = %identity, "Deleting client");
        self.store.delete(identity).await
    }

    /// Reconcile one desired-state object.
    ///
    /// # Errors
    ///
    /// Validation errors short-circuit before any store call; store errors
    /// are returned unmodified.
    pub async fn reconcile(&self, client: &CephClient) -> Result<ReconcileOutcome> {
        let record = client.record();
        let identity = record.identity.clone();

        if client.is_being_deleted() {
            validate_identity(&identity)?;
            let action = if self.exists(&identity).await? {
                self.delete(&identity).await?;
                ReconcileAction::Deleted
            } else {
                debug!(client = %identity, "Nothing to delete");
                ReconcileAction::AlreadyAbsent
            };
            return Ok(ReconcileOutcome::new(identity, action));
        }

        validate(&record)?;

        let action = match self.store.get(&identity).await? {
            None => {
                self.create(&record).await?;
                ReconcileAction::Created
            }
            Some(observed) if changed(&observed, &record.caps) => {
                let applied = self.update(&identity, &observed, &record.caps).await?;
                ReconcileAction::Updated { applied }
            }
            Some(_) => {
                debug!(client = %identity, "Caps unchanged");
                ReconcileAction::Unchanged
            }
        };

        Ok(ReconcileOutcome::new(identity, action))
    }

    /// Reconcile a batch of objects.
    ///
    /// Objects sharing an identity run one after another in input order;
    /// distinct identities run concurrently, at most `max_concurrent` at once.
    pub async fn reconcile_all(&self, clients: &[CephClient]) -> ReconcileReport {
        let groups = clients.iter().into_group_map_by(|client| client.identity());

        info!(
            clients = clients.len(),
            identities = groups.len(),
            "Starting reconciliation"
        );

        let results: Vec<(ClientIdentity, Vec<Result<ReconcileOutcome>>)> = stream::iter(groups)
            .map(|(identity, group)| async move {
                let mut outcomes = Vec::with_capacity(group.len());
                for client in group {
                    outcomes.push(self.reconcile(client).await);
                }
                (identity, outcomes)
            })
            .buffer_unordered(self.config.max_concurrent.max(1))
            .collect()
            .await;

        let mut report = ReconcileReport::default();
        for (identity, outcomes) in results {
            for outcome in outcomes {
                match outcome {
                    Ok(outcome) => report.succeeded.push(outcome),
                    Err(e) => {
                        warn!(client = %identity, error = %e, "Reconciliation failed");
                        report
                            .failed
                            .push(ReconcileFailure::new(identity.clone(), e.to_string()));
                    }
                }
            }
        }

        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            mutated = report.mutated_count(),
            "Reconciliation complete"
        );
        report
    }

    /// Get the store.
    pub fn store(&self) -> &Arc<dyn AuthStore> {
        &self.store
    }

    /// Get the configuration.
    pub const fn config(&self) -> &ReconcilerConfig {
        &self.config
    }
}

/// Builder for Reconciler.
#[derive(Default)]
pub struct ReconcilerBuilder {
    store: Option<Arc<dyn AuthStore>>,
    config: ReconcilerConfig,
}

impl ReconcilerBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the authentication store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn AuthStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set max concurrent identities.
    #[must_use]
    pub const fn max_concurrent(mut self, max: usize) -> Self {
        self.config.max_concurrent = max;
        self
    }

    /// Build the reconciler.
    ///
    /// # Errors
    ///
    /// Returns error if no store was set or concurrency is zero.
    pub fn build(self) -> Result<Reconciler> {
        let store = self
            .store
            .ok_or_else(|| Error::invalid_config("authentication store is required"))?;

        if self.config.max_concurrent == 0 {
            return Err(Error::invalid_config("max_concurrent must be at least 1"));
        }

        Ok(Reconciler::new(store, self.config))
    }
}
