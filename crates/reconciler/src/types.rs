//! Core types for the reconciler.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::caps::CapabilitySet;
use crate::resource::ClientStatus;

/// The `(name, namespace)` pair addressing one client credential.
///
/// The namespace selects the cluster; the name is unique within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientIdentity {
    pub name: String,
    pub namespace: String,
}

impl ClientIdentity {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// The entity name the cluster knows this client by.
    #[must_use]
    pub fn entity(&self) -> String {
        format!("client.{}", self.name)
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A client identity together with its caps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub identity: ClientIdentity,
    pub caps: CapabilitySet,
}

impl ClientRecord {
    pub const fn new(identity: ClientIdentity, caps: CapabilitySet) -> Self {
        Self { identity, caps }
    }
}

/// What a reconcile pass did to the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconcileAction {
    /// The credential did not exist and was created.
    Created,
    /// Caps differed and were rewritten to `applied`.
    Updated { applied: CapabilitySet },
    /// Observed caps already satisfy the desired caps.
    Unchanged,
    /// The credential existed and was removed.
    Deleted,
    /// Deletion was requested but nothing was registered.
    AlreadyAbsent,
}

impl ReconcileAction {
    /// Whether the pass issued a mutating command.
    #[must_use]
    pub const fn mutated(&self) -> bool {
        matches!(self, Self::Created | Self::Updated { .. } | Self::Deleted)
    }

    /// Get a description of the action.
    #[must_use]
    pub fn description(&self, identity: &ClientIdentity) -> String {
        match self {
            Self::Created => format!("created {identity}"),
            Self::Updated { .. } => format!("updated caps of {identity}"),
            Self::Unchanged => format!("{identity} is up to date"),
            Self::Deleted => format!("deleted {identity}"),
            Self::AlreadyAbsent => format!("{identity} already absent"),
        }
    }
}

/// Result of reconciling a single client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub identity: ClientIdentity,
    pub action: ReconcileAction,
}

impl ReconcileOutcome {
    pub const fn new(identity: ClientIdentity, action: ReconcileAction) -> Self {
        Self { identity, action }
    }

    /// Status to record on the resource, `None` once it is gone.
    #[must_use]
    pub fn status(&self) -> Option<ClientStatus> {
        match self.action {
            ReconcileAction::Deleted | ReconcileAction::AlreadyAbsent => None,
            ReconcileAction::Created
            | ReconcileAction::Updated { .. }
            | ReconcileAction::Unchanged => Some(ClientStatus::ready(&self.identity)),
        }
    }

    #[must_use]
    pub fn description(&self) -> String {
        self.action.description(&self.identity)
    }
}

/// A client whose reconciliation returned an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileFailure {
    pub identity: ClientIdentity,
    pub reason: String,
    pub status: ClientStatus,
}

impl ReconcileFailure {
    pub fn new(identity: ClientIdentity, reason: impl Into<String>) -> Self {
        Self {
            identity,
            reason: reason.into(),
            status: ClientStatus::failed(),
        }
    }
}

/// Result of reconciling a batch with partial success support.
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    /// Clients that reconciled.
    pub succeeded: Vec<ReconcileOutcome>,
    /// Clients that failed with errors.
    pub failed: Vec<ReconcileFailure>,
}

impl ReconcileReport {
    /// Check if all clients reconciled.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    /// Get the total number of clients processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded.len().saturating_add(self.failed.len())
    }

    /// Number of clients whose pass issued a mutating command.
    #[must_use]
    pub fn mutated_count(&self) -> usize {
        self.succeeded
            .iter()
            .filter(|outcome| outcome.action.mutated())
            .count()
    }
}
