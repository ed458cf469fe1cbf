//! End-to-end reconciliation through the `ceph auth` adapter.
//!
//! A fake `ceph` CLI keeps a keyring in memory and answers the commands the
//! adapter issues, including `ENOENT` for unknown entities.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ceph_client_core::{CephConfig, ReconcilerConfig};
use ceph_client_reconciler::{
    CapabilitySet, CephAuthStore, CephClient, ClientIdentity, ClientRecord, CommandError,
    CommandExecutor, Error, ReconcileAction, Reconciler, ValidationError,
};
use chrono::Utc;

/// In-memory keyring answering `ceph auth` commands.
#[derive(Default)]
struct FakeCephCli {
    keyring: Mutex<HashMap<String, HashMap<String, String>>>,
    commands: Mutex<Vec<String>>,
}

impl FakeCephCli {
    fn command_count(&self) -> usize {
        self.commands.lock().map(|c| c.len()).unwrap_or_default()
    }

    fn mutating_commands(&self) -> Vec<String> {
        self.commands
            .lock()
            .map(|c| c.iter().filter(|verb| verb.as_str() != "get").cloned().collect())
            .unwrap_or_default()
    }

    /// Register `entity` in `cluster` directly, bypassing the adapter.
    fn register(&self, cluster: &str, entity: &str, caps: &[(&str, &str)]) {
        if let Ok(mut keyring) = self.keyring.lock() {
            keyring.insert(
                format!("{cluster}/{entity}"),
                caps.iter()
                    .map(|(subsystem, cap)| ((*subsystem).to_string(), (*cap).to_string()))
                    .collect(),
            );
        }
    }

    fn caps_of(&self, cluster: &str, entity: &str) -> Option<HashMap<String, String>> {
        self.keyring
            .lock()
            .ok()
            .and_then(|keyring| keyring.get(&format!("{cluster}/{entity}")).cloned())
    }

    fn enoent(entity: &str) -> CommandError {
        CommandError::Failed {
            command: "ceph".to_string(),
            exit_code: Some(2),
            stderr: format!("Error ENOENT: failed to find {entity} in keyring"),
        }
    }

    /// Leading `<subsystem> <cap>` pairs, stopping at the first `--flag`.
    fn caps_from(args: &[String]) -> HashMap<String, String> {
        args.iter()
            .take_while(|arg| !arg.starts_with("--"))
            .collect::<Vec<_>>()
            .chunks(2)
            .filter_map(|pair| match pair {
                [subsystem, cap] => Some(((*subsystem).clone(), (*cap).clone())),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl CommandExecutor for FakeCephCli {
    async fn execute_with_output_file(
        &self,
        _action_name: &str,
        _command: &str,
        _outfile: Option<&Path>,
        args: &[String],
    ) -> Result<String, CommandError> {
        let (verb, entity, rest) = match args {
            [auth, verb, entity, rest @ ..] if auth == "auth" => (verb.as_str(), entity, rest),
            _ => {
                return Err(CommandError::Failed {
                    command: "ceph".to_string(),
                    exit_code: Some(22),
                    stderr: "Error EINVAL: invalid command".to_string(),
                });
            }
        };

        // entities are scoped to the cluster the command targets
        let cluster = rest
            .iter()
            .find_map(|arg| arg.strip_prefix("--cluster="))
            .unwrap_or_default();
        let key = format!("{cluster}/{entity}");

        if let Ok(mut commands) = self.commands.lock() {
            commands.push(verb.to_string());
        }

        let mut keyring = self
            .keyring
            .lock()
            .map_err(|e| CommandError::Spawn {
                command: "ceph".to_string(),
                reason: e.to_string(),
            })?;

        match verb {
            "get" => keyring
                .get(&key)
                .map(|caps| {
                    serde_json::json!([{ "entity": entity, "key": "AQBfake==", "caps": caps }])
                        .to_string()
                })
                .ok_or_else(|| Self::enoent(entity)),
            "get-or-create-key" => {
                let caps = Self::caps_from(rest);
                match keyring.get(&key) {
                    Some(existing) if *existing != caps => Err(CommandError::Failed {
                        command: "ceph".to_string(),
                        exit_code: Some(22),
                        stderr: format!("Error EINVAL: key for {entity} exists but cap mismatch"),
                    }),
                    _ => {
                        keyring.insert(key, caps);
                        Ok(r#"{"key":"AQBfake=="}"#.to_string())
                    }
                }
            }
            "caps" => match keyring.get_mut(&key) {
                Some(existing) => {
                    *existing = Self::caps_from(rest);
                    Ok(String::new())
                }
                None => Err(Self::enoent(entity)),
            },
            "del" => keyring
                .remove(&key)
                .map(|_| String::new())
                .ok_or_else(|| Self::enoent(entity)),
            _ => Err(CommandError::Failed {
                command: "ceph".to_string(),
                exit_code: Some(22),
                stderr: format!("Error EINVAL: unknown verb {verb}"),
            }),
        }
    }
}

fn setup() -> (Reconciler, Arc<FakeCephCli>) {
    let cli = Arc::new(FakeCephCli::default());
    let store = Arc::new(CephAuthStore::new(cli.clone(), CephConfig::default()));
    (Reconciler::new(store, ReconcilerConfig::default()), cli)
}

fn identity(name: &str) -> ClientIdentity {
    ClientIdentity::new(name, "myns")
}

/// # GIVEN
/// An empty keyring
///
/// # WHEN
/// A fully specified client is created
///
/// # THEN
/// It exists afterwards
#[tokio::test]
async fn test_create_then_exists() -> Result<(), Error> {
    let (reconciler, _) = setup();
    let record = ClientRecord::new(identity("client1"), CapabilitySet::uniform("allow *"));

    assert!(!reconciler.exists(&record.identity).await?);
    reconciler.create(&record).await?;
    assert!(reconciler.exists(&record.identity).await?);
    Ok(())
}

#[tokio::test]
async fn test_create_with_empty_caps_issues_no_command() {
    let (reconciler, cli) = setup();
    let record = ClientRecord::new(identity("client1"), CapabilitySet::default());

    let result = reconciler.create(&record).await;
    assert!(matches!(result, Err(Error::EmptyCapabilities { .. })));
    assert_eq!(cli.command_count(), 0);
}

#[tokio::test]
async fn test_delete_existing_then_absent() -> Result<(), Error> {
    let (reconciler, _) = setup();
    let record = ClientRecord::new(identity("client1"), CapabilitySet::uniform("allow *"));
    reconciler.create(&record).await?;

    reconciler.delete(&record.identity).await?;
    assert!(!reconciler.exists(&record.identity).await?);

    // second delete hits ENOENT and still succeeds
    reconciler.delete(&record.identity).await?;

    let never = identity("client2");
    assert!(!reconciler.exists(&never).await?);
    reconciler.delete(&never).await
}

/// # GIVEN
/// A client registered with `allow *` everywhere
///
/// # WHEN
/// The desired object leaves osd blank
///
/// # THEN
/// The object is rejected before any command, and a direct update keeps
/// the osd cap instead of clearing it
#[tokio::test]
async fn test_blank_desired_cap_does_not_reset_grant() -> Result<(), Error> {
    let (reconciler, cli) = setup();
    reconciler
        .reconcile(&CephClient::new("client1", "myns", CapabilitySet::uniform("allow *")))
        .await?;

    let mut partial = CephClient::new("client1", "myns", CapabilitySet::uniform("allow *"));
    partial.spec.caps.osd = String::new();

    // a partial object is rejected up front, before the diff
    let result = reconciler.reconcile(&partial).await;
    assert!(matches!(
        result,
        Err(Error::Validation(ValidationError::IncompleteCapabilities))
    ));

    // the direct update path merges instead of clearing
    let applied = reconciler
        .update(
            &identity("client1"),
            &CapabilitySet::uniform("allow *"),
            &CapabilitySet::new("", "allow r", ""),
        )
        .await?;
    assert_eq!(applied, CapabilitySet::new("allow *", "allow r", "allow *"));
    assert_eq!(cli.mutating_commands(), vec!["get-or-create-key", "caps"]);
    Ok(())
}

/// # GIVEN
/// A client that also holds an `mgr` cap, granted outside this tool
///
/// # WHEN
/// Its osd/mon/mds caps are changed
///
/// # THEN
/// The new caps are applied and the `mgr` grant is still there
#[tokio::test]
async fn test_update_keeps_grants_outside_the_model() -> Result<(), Error> {
    let (reconciler, cli) = setup();
    cli.register(
        "myns",
        "client.c1",
        &[
            ("mgr", "allow r"),
            ("mon", "allow *"),
            ("osd", "allow *"),
            ("mds", "allow *"),
        ],
    );

    let outcome = reconciler
        .reconcile(&CephClient::new("c1", "myns", CapabilitySet::uniform("allow rwx")))
        .await?;
    assert!(matches!(outcome.action, ReconcileAction::Updated { .. }));

    let caps = cli.caps_of("myns", "client.c1").unwrap_or_default();
    assert_eq!(caps.get("mgr").map(String::as_str), Some("allow r"));
    assert_eq!(caps.get("osd").map(String::as_str), Some("allow rwx"));
    assert_eq!(caps.get("mon").map(String::as_str), Some("allow rwx"));
    assert_eq!(caps.get("mds").map(String::as_str), Some("allow rwx"));

    // a second pass sees nothing to do
    let again = reconciler
        .reconcile(&CephClient::new("c1", "myns", CapabilitySet::uniform("allow rwx")))
        .await?;
    assert_eq!(again.action, ReconcileAction::Unchanged);
    Ok(())
}

#[tokio::test]
async fn test_full_lifecycle() -> Result<(), Error> {
    let (reconciler, cli) = setup();
    let mut client = CephClient::new("glance", "rook-ceph", CapabilitySet::uniform("allow *"));

    let created = reconciler.reconcile(&client).await?;
    assert_eq!(created.action, ReconcileAction::Created);

    let unchanged = reconciler.reconcile(&client).await?;
    assert_eq!(unchanged.action, ReconcileAction::Unchanged);

    client.spec.caps = CapabilitySet::uniform("allow rwx pool=test");
    let updated = reconciler.reconcile(&client).await?;
    assert!(matches!(updated.action, ReconcileAction::Updated { .. }));

    let client = client.deleting(Utc::now());
    let deleted = reconciler.reconcile(&client).await?;
    assert_eq!(deleted.action, ReconcileAction::Deleted);

    let absent = reconciler.reconcile(&client).await?;
    assert_eq!(absent.action, ReconcileAction::AlreadyAbsent);

    assert_eq!(
        cli.mutating_commands(),
        vec!["get-or-create-key", "caps", "del"]
    );
    Ok(())
}

#[tokio::test]
async fn test_reconcile_all_across_namespaces() {
    let (reconciler, _) = setup();
    let clients = vec![
        CephClient::new("a", "ns1", CapabilitySet::uniform("allow r")),
        CephClient::new("a", "ns2", CapabilitySet::uniform("allow r")),
        CephClient::new("", "ns1", CapabilitySet::uniform("allow r")),
    ];

    let report = reconciler.reconcile_all(&clients).await;
    assert_eq!(report.succeeded.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.mutated_count(), 2);
}
