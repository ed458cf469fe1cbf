//! The `CephClient` desired-state object.
//!
//! Shape follows the `ceph.rook.io/v1` custom resource:
//!
//! ```yaml
//! apiVersion: ceph.rook.io/v1
//! kind: CephClient
//! metadata:
//!   name: glance
//!   namespace: rook-ceph
//! spec:
//!   caps:
//!     osd: "profile rbd pool=images"
//!     mon: "profile rbd"
//!     mds: "allow r"
//! ```

use std::collections::BTreeMap;

use ceph_client_core::{Error as CoreError, Result as CoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::caps::CapabilitySet;
use crate::types::{ClientIdentity, ClientRecord};

pub const KIND: &str = "CephClient";
pub const API_VERSION: &str = "ceph.rook.io/v1";

/// Info key naming the secret that holds the client's key.
pub const SECRET_NAME_KEY: &str = "secretName";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSpec {
    /// Entity name override; `metadata.name` is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub caps: CapabilitySet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientPhase {
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStatus {
    pub phase: ClientPhase,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub info: BTreeMap<String, String>,
}

impl ClientStatus {
    /// Reconciled; `info` names the secret the key is published under.
    #[must_use]
    pub fn ready(identity: &ClientIdentity) -> Self {
        let info = BTreeMap::from([(
            SECRET_NAME_KEY.to_string(),
            secret_name(identity),
        )]);
        Self {
            phase: ClientPhase::Ready,
            info,
        }
    }

    #[must_use]
    pub const fn failed() -> Self {
        Self {
            phase: ClientPhase::Failed,
            info: BTreeMap::new(),
        }
    }
}

/// Name of the secret holding the key for `identity`.
#[must_use]
pub fn secret_name(identity: &ClientIdentity) -> String {
    format!("rook-ceph-client-{}", identity.name)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CephClient {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ClientSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ClientStatus>,
}

fn default_api_version() -> String {
    API_VERSION.to_string()
}

fn default_kind() -> String {
    KIND.to_string()
}

impl CephClient {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, caps: CapabilitySet) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            metadata: ObjectMeta {
                name: name.into(),
                namespace: namespace.into(),
                deletion_timestamp: None,
            },
            spec: ClientSpec { name: None, caps },
            status: None,
        }
    }

    /// Mark the object as being deleted.
    #[must_use]
    pub fn deleting(mut self, at: DateTime<Utc>) -> Self {
        self.metadata.deletion_timestamp = Some(at);
        self
    }

    #[must_use]
    pub const fn is_being_deleted(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    #[must_use]
    pub fn identity(&self) -> ClientIdentity {
        let name = self
            .spec
            .name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(self.metadata.name.as_str());
        ClientIdentity::new(name, self.metadata.namespace.clone())
    }

    #[must_use]
    pub fn record(&self) -> ClientRecord {
        ClientRecord::new(self.identity(), self.spec.caps.clone())
    }
}

/// Parse every `CephClient` in a (possibly multi-document) YAML manifest.
///
/// Empty documents are skipped.
///
/// # Errors
///
/// Returns error if a document is malformed or declares another kind.
pub fn load_manifests(content: &str) -> CoreResult<Vec<CephClient>> {
    let mut clients = Vec::new();

    for document in serde_yaml::Deserializer::from_str(content) {
        let value = serde_yaml::Value::deserialize(document)
            .map_err(|e| CoreError::yaml_parse_failed(e.to_string()))?;
        if value.is_null() {
            continue;
        }

        let client: CephClient = serde_yaml::from_value(value)
            .map_err(|e| CoreError::yaml_parse_failed(e.to_string()))?;
        if client.kind != KIND {
            return Err(CoreError::yaml_parse_failed(format!(
                "expected kind {KIND}, found {}",
                client.kind
            )));
        }

        debug!(client = %client.identity(), "Loaded manifest");
        clients.push(client);
    }

    Ok(clients)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
apiVersion: ceph.rook.io/v1
kind: CephClient
metadata:
  name: glance
  namespace: rook-ceph
spec:
  caps:
    osd: "profile rbd pool=images"
    mon: "profile rbd"
    mds: "allow r"
---
apiVersion: ceph.rook.io/v1
kind: CephClient
metadata:
  name: cinder
  namespace: rook-ceph
  deletionTimestamp: "2024-05-01T10:00:00Z"
spec:
  name: cinder-volumes
  caps:
    mon: "profile rbd"
---
"#;

    #[test]
    fn test_load_multi_document_manifest() -> CoreResult<()> {
        let clients = load_manifests(MANIFEST)?;
        assert_eq!(clients.len(), 2);

        let glance = clients.first().ok_or_else(|| CoreError::yaml_parse_failed("missing"))?;
        assert_eq!(glance.identity(), ClientIdentity::new("glance", "rook-ceph"));
        assert_eq!(glance.spec.caps.osd, "profile rbd pool=images");
        assert!(!glance.is_being_deleted());

        let cinder = clients.get(1).ok_or_else(|| CoreError::yaml_parse_failed("missing"))?;
        assert!(cinder.is_being_deleted());
        assert_eq!(cinder.identity().name, "cinder-volumes");
        assert_eq!(cinder.spec.caps.osd, "");
        Ok(())
    }

    #[test]
    fn test_other_kinds_are_rejected() {
        let result = load_manifests("kind: CephBlockPool\nmetadata:\n  name: pool\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_yaml_is_rejected() {
        assert!(load_manifests("metadata: [unterminated").is_err());
    }

    #[test]
    fn test_ready_status_names_secret() {
        let status = ClientStatus::ready(&ClientIdentity::new("glance", "rook-ceph"));
        assert_eq!(status.phase, ClientPhase::Ready);
        assert_eq!(
            status.info.get(SECRET_NAME_KEY).map(String::as_str),
            Some("rook-ceph-client-glance")
        );
    }

    #[test]
    fn test_empty_spec_name_falls_back_to_metadata() {
        let mut client = CephClient::new("glance", "rook-ceph", CapabilitySet::default());
        client.spec.name = Some(String::new());
        assert_eq!(client.identity().name, "glance");
    }
}
