//! The external authentication store, seen through a narrow trait.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::caps::CapabilitySet;
use crate::error::{Error, Result};
use crate::types::{ClientIdentity, ClientRecord};

/// Registry of client credentials and their caps.
///
/// Implementations are the single source of truth for observed caps. The
/// reconciler holds no state of its own.
#[async_trait]
pub trait AuthStore: Send + Sync {
    /// Observed caps, `None` when the identity is not registered.
    async fn get(&self, identity: &ClientIdentity) -> Result<Option<CapabilitySet>>;

    /// Whether the identity is registered. Not-found is `Ok(false)`.
    ///
    /// # Errors
    ///
    /// The query could not be run, or it ran but its output could not be
    /// read as an entry (`MalformedOutput`). Only an explicit not-found
    /// answer counts as absent.
    async fn exists(&self, identity: &ClientIdentity) -> Result<bool> {
        Ok(self.get(identity).await?.is_some())
    }

    /// Register a credential with the given caps.
    async fn create(&self, record: &ClientRecord) -> Result<()>;

    /// Replace the caps of a registered credential.
    async fn update(&self, record: &ClientRecord) -> Result<()>;

    /// Remove a credential. Removing an absent identity succeeds.
    async fn delete(&self, identity: &ClientIdentity) -> Result<()>;
}

/// In-memory store with the same semantics as the cluster.
#[derive(Debug, Default)]
pub struct InMemoryAuthStore {
    clients: RwLock<HashMap<ClientIdentity, CapabilitySet>>,
    mutations: AtomicUsize,
}

impl InMemoryAuthStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `records`.
    pub fn with_records(records: impl IntoIterator<Item = ClientRecord>) -> Self {
        let clients = records
            .into_iter()
            .map(|record| (record.identity, record.caps))
            .collect();
        Self {
            clients: RwLock::new(clients),
            mutations: AtomicUsize::new(0),
        }
    }

    /// Number of create, update and delete calls that reached the store.
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Number of registered credentials.
    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }

    fn record_mutation(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl AuthStore for InMemoryAuthStore {
    async fn get(&self, identity: &ClientIdentity) -> Result<Option<CapabilitySet>> {
        Ok(self.clients.read().await.get(identity).cloned())
    }

    async fn create(&self, record: &ClientRecord) -> Result<()> {
        self.record_mutation();
        let mut clients = self.clients.write().await;

        // get-or-create: an existing credential is only accepted with identical caps
        match clients.get(&record.identity) {
            Some(existing) if *existing != record.caps => Err(Error::external_command(
                "auth get-or-create-key",
                format!("key for {} exists but caps do not match", record.identity.entity()),
            )),
            Some(_) => Ok(()),
            None => {
                clients.insert(record.identity.clone(), record.caps.clone());
                Ok(())
            }
        }
    }

    async fn update(&self, record: &ClientRecord) -> Result<()> {
        self.record_mutation();
        let mut clients = self.clients.write().await;

        match clients.get_mut(&record.identity) {
            Some(caps) => {
                *caps = record.caps.clone();
                Ok(())
            }
            None => Err(Error::external_command(
                "auth caps",
                format!("ENOENT: {} does not exist", record.identity.entity()),
            )),
        }
    }

    async fn delete(&self, identity: &ClientIdentity) -> Result<()> {
        self.record_mutation();
        self.clients.write().await.remove(identity);
        Ok(())
    }
}
