//! Pre-flight checks on desired-state records.

use crate::error::ValidationError;
use crate::types::{ClientIdentity, ClientRecord};

/// Check that an identity can address a credential.
///
/// # Errors
///
/// `MissingName` or `MissingNamespace` when either part is empty.
pub fn validate_identity(identity: &ClientIdentity) -> Result<(), ValidationError> {
    if identity.name.is_empty() {
        return Err(ValidationError::MissingName);
    }
    if identity.namespace.is_empty() {
        return Err(ValidationError::MissingNamespace);
    }
    Ok(())
}

/// Check that a record is fit to be created or updated on the cluster.
///
/// Caps must be fully specified: one or two caps are as invalid as none.
///
/// # Errors
///
/// Returns the first failing check, in the order name, namespace, caps.
pub fn validate(record: &ClientRecord) -> Result<(), ValidationError> {
    validate_identity(&record.identity)?;

    if record.caps.is_empty() {
        return Err(ValidationError::NoCapabilities);
    }
    if !record.caps.is_complete() {
        return Err(ValidationError::IncompleteCapabilities);
    }
    Ok(())
}
