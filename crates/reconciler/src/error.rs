//! Error types for the reconciler crate.

use thiserror::Error;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A desired-state object that must not reach the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("client name is required")]
    MissingName,
    #[error("client namespace is required")]
    MissingNamespace,
    #[error("at least one of osd, mon or mds caps is required")]
    NoCapabilities,
    #[error("osd, mon and mds caps must all be set")]
    IncompleteCapabilities,
}

/// Reconciler error types.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Rejected before any external call.
    #[error("invalid client: {0}")]
    Validation(#[from] ValidationError),
    /// Create was asked to grant a partial cap set.
    #[error("cannot create {entity}: osd, mon and mds caps must all be set")]
    EmptyCapabilities { entity: String },
    /// The authentication store command failed.
    #[error("{action} failed: {reason}")]
    ExternalCommand { action: String, reason: String },
    /// The authentication store answered with something unreadable.
    #[error("unexpected output from {action}: {reason}")]
    MalformedOutput { action: String, reason: String },
    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Create an empty capabilities error.
    pub fn empty_capabilities(entity: impl Into<String>) -> Self {
        Self::EmptyCapabilities {
            entity: entity.into(),
        }
    }

    /// Create an external command error.
    pub fn external_command(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExternalCommand {
            action: action.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed output error.
    pub fn malformed_output(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedOutput {
            action: action.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Whether the error was raised locally without touching the cluster.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::EmptyCapabilities { .. } | Self::InvalidConfig { .. }
        )
    }
}
