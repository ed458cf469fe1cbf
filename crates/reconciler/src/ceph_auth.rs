//! [`AuthStore`] backed by the `ceph auth` command family.
//!
//! `ceph auth caps` replaces a client's whole cap set. Caps on subsystems
//! outside [`Subsystem::ALL`] (`mgr`, for one) are read back before every
//! update and sent again so they survive.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use ceph_client_core::CephConfig;
use serde::Deserialize;
use tracing::debug;

use crate::caps::{CapabilitySet, Subsystem};
use crate::error::{Error, Result};
use crate::executor::{CommandError, CommandExecutor};
use crate::store::AuthStore;
use crate::types::{ClientIdentity, ClientRecord};

const ACTION_GET: &str = "auth get";
const ACTION_CREATE: &str = "auth get-or-create-key";
const ACTION_UPDATE: &str = "auth caps";
const ACTION_DELETE: &str = "auth del";

/// One keyring entry as printed by `ceph auth get --format json`.
#[derive(Debug, Deserialize)]
struct AuthEntry {
    entity: String,
    #[serde(default)]
    caps: BTreeMap<String, String>,
}

impl AuthEntry {
    fn capability_set(&self) -> CapabilitySet {
        let cap = |subsystem: Subsystem| {
            self.caps
                .get(subsystem.as_str())
                .cloned()
                .unwrap_or_default()
        };
        CapabilitySet::new(cap(Subsystem::Osd), cap(Subsystem::Mon), cap(Subsystem::Mds))
    }

    /// Granted caps on subsystems [`CapabilitySet`] does not model.
    fn unmodeled_caps(&self) -> impl Iterator<Item = (&str, &str)> {
        self.caps
            .iter()
            .filter(|(subsystem, cap)| {
                !cap.is_empty()
                    && !Subsystem::ALL
                        .iter()
                        .any(|known| known.as_str() == subsystem.as_str())
            })
            .map(|(subsystem, cap)| (subsystem.as_str(), cap.as_str()))
    }
}

/// Extract `entity`'s entry from `ceph auth get` JSON output.
fn parse_auth_get(output: &str, entity: &str) -> Result<AuthEntry> {
    let entries: Vec<AuthEntry> = serde_json::from_str(output.trim())
        .map_err(|e| Error::malformed_output(ACTION_GET, e.to_string()))?;

    entries
        .into_iter()
        .find(|entry| entry.entity == entity)
        .ok_or_else(|| Error::malformed_output(ACTION_GET, format!("no entry for {entity}")))
}

/// `osd <cap> mon <cap> mds <cap>` for every granted cap.
fn cap_args(caps: &CapabilitySet) -> impl Iterator<Item = String> + '_ {
    caps.granted()
        .flat_map(|(subsystem, cap)| [subsystem.as_str().to_string(), cap.to_string()])
}

/// Talks to the cluster through a [`CommandExecutor`].
pub struct CephAuthStore {
    executor: Arc<dyn CommandExecutor>,
    config: CephConfig,
}

impl CephAuthStore {
    pub fn new(executor: Arc<dyn CommandExecutor>, config: CephConfig) -> Self {
        Self { executor, config }
    }

    /// Full argument list: `auth <verb> <entity> [extra..] <cluster args>`.
    fn args(
        &self,
        verb: &str,
        identity: &ClientIdentity,
        extra: impl IntoIterator<Item = String>,
    ) -> Vec<String> {
        ["auth".to_string(), verb.to_string(), identity.entity()]
            .into_iter()
            .chain(extra)
            .chain(self.config.cluster_args(&identity.namespace))
            .collect()
    }

    async fn run(&self, action: &str, args: &[String]) -> std::result::Result<String, CommandError> {
        self.executor
            .execute_with_output_file(action, &self.config.binary, None, args)
            .await
    }

    /// The registered entry, `None` on `ENOENT`.
    async fn fetch_entry(&self, identity: &ClientIdentity) -> Result<Option<AuthEntry>> {
        let args = self.args("get", identity, []);

        match self.run(ACTION_GET, &args).await {
            Ok(output) => parse_auth_get(&output, &identity.entity()).map(Some),
            Err(e) if e.is_not_found() => {
                debug!(client = %identity, "Client not registered");
                Ok(None)
            }
            Err(e) => Err(Error::external_command(ACTION_GET, e.to_string())),
        }
    }
}

#[async_trait]
impl AuthStore for CephAuthStore {
    async fn get(&self, identity: &ClientIdentity) -> Result<Option<CapabilitySet>> {
        Ok(self
            .fetch_entry(identity)
            .await?
            .map(|entry| entry.capability_set()))
    }

    async fn create(&self, record: &ClientRecord) -> Result<()> {
        let args = self.args("get-or-create-key", &record.identity, cap_args(&record.caps));

        self.run(ACTION_CREATE, &args)
            .await
            .map(|_| ())
            .map_err(|e| Error::external_command(ACTION_CREATE, e.to_string()))
    }

    async fn update(&self, record: &ClientRecord) -> Result<()> {
        let current = self.fetch_entry(&record.identity).await?;
        let kept: Vec<String> = current
            .iter()
            .flat_map(AuthEntry::unmodeled_caps)
            .flat_map(|(subsystem, cap)| [subsystem.to_string(), cap.to_string()])
            .collect();
        if !kept.is_empty() {
            debug!(client = %record.identity, ?kept, "Keeping caps outside osd/mon/mds");
        }

        let args = self.args(
            "caps",
            &record.identity,
            cap_args(&record.caps).chain(kept),
        );

        self.run(ACTION_UPDATE, &args)
            .await
            .map(|_| ())
            .map_err(|e| Error::external_command(ACTION_UPDATE, e.to_string()))
    }

    async fn delete(&self, identity: &ClientIdentity) -> Result<()> {
        let args = self.args("del", identity, []);

        match self.run(ACTION_DELETE, &args).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!(client = %identity, "Client already removed");
                Ok(())
            }
            Err(e) => Err(Error::external_command(ACTION_DELETE, e.to_string())),
        }
    }
}
