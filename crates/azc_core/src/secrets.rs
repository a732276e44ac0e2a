//! Two-phase secret lifecycle.
//!
//! Components register secrets while they declare their resources and
//! commit them once, after construction is complete:
//!
//! 1. **Register**: [`SecretCollector::register`] records a name and a
//!    deferred value. Nothing is resolved or written.
//! 2. **Commit**: [`SecretCollector::commit`] resolves every pending value
//!    and hands the whole set to the [`SecretStore`] in a single write.
//!
//! A collector commits at most once. Registering after the commit, or
//! committing twice, is a configuration error reported immediately.

use azc_output::Output;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{CoreError, CoreResult};
use crate::naming::checked_secret_name;
use crate::store::{SecretEntry, SecretStore};
use crate::vault::VaultRef;

#[derive(Debug, Clone)]
struct PendingSecret {
    raw_name: String,
    name: String,
    value: Output<String>,
    content_type: Option<String>,
}

/// Summary of a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitReport {
    /// Vault written to, if anything was written.
    pub vault: Option<String>,
    /// Secret names in registration order.
    pub names: Vec<String>,
}

impl CommitReport {
    pub fn written(&self) -> usize {
        self.names.len()
    }
}

/// Collects secrets during construction and writes them in one batch.
#[derive(Debug)]
pub struct SecretCollector {
    owner: String,
    pending: Vec<PendingSecret>,
    committed: bool,
}

impl SecretCollector {
    /// Create a collector for the component named `owner`.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            pending: Vec::new(),
            committed: false,
        }
    }

    /// Register a secret. Names are normalized; registering the same name
    /// again replaces the pending value in place.
    pub fn register(
        &mut self,
        name: &str,
        value: impl Into<Output<String>>,
    ) -> CoreResult<&mut Self> {
        self.push(name, value.into(), None)
    }

    /// Register a secret with a content type hint.
    pub fn register_with_content_type(
        &mut self,
        name: &str,
        value: impl Into<Output<String>>,
        content_type: impl Into<String>,
    ) -> CoreResult<&mut Self> {
        self.push(name, value.into(), Some(content_type.into()))
    }

    /// Register a secret only when `condition` holds.
    pub fn register_if(
        &mut self,
        condition: bool,
        name: &str,
        value: impl Into<Output<String>>,
    ) -> CoreResult<&mut Self> {
        if condition {
            self.register(name, value)
        } else {
            Ok(self)
        }
    }

    fn push(
        &mut self,
        name: &str,
        value: Output<String>,
        content_type: Option<String>,
    ) -> CoreResult<&mut Self> {
        if self.committed {
            return Err(CoreError::AlreadyCommitted(self.owner.clone()));
        }

        let raw_name = name;
        let name = checked_secret_name(raw_name)?;
        let secret = PendingSecret {
            raw_name: raw_name.to_string(),
            name: name.clone(),
            value,
            content_type,
        };

        match self.pending.iter_mut().find(|p| p.name == name) {
            Some(existing) => {
                if existing.raw_name != raw_name {
                    warn!(
                        "Secret names '{}' and '{}' on {} both normalize to '{}'; keeping the latest",
                        existing.raw_name, raw_name, self.owner, name
                    );
                } else {
                    debug!("Replacing pending secret {} on {}", name, self.owner);
                }
                *existing = secret;
            }
            None => self.pending.push(secret),
        }
        Ok(self)
    }

    /// Pending secret names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.pending.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Resolve every pending secret and write them in one batch.
    ///
    /// With nothing registered the commit succeeds without touching the
    /// store. A failed commit is final: the batch is not retried and nothing
    /// is written when any value fails to resolve.
    pub async fn commit(
        &mut self,
        vault: Option<&VaultRef>,
        store: &dyn SecretStore,
    ) -> CoreResult<CommitReport> {
        if self.committed {
            return Err(CoreError::AlreadyCommitted(self.owner.clone()));
        }
        self.committed = true;

        if self.pending.is_empty() {
            debug!("No secrets to commit for {}", self.owner);
            return Ok(CommitReport::default());
        }

        let vault = vault.ok_or_else(|| {
            CoreError::MissingVault(format!(
                "{} has {} secrets to store",
                self.owner,
                self.pending.len()
            ))
        })?;

        let pending = std::mem::take(&mut self.pending);
        let values = Output::all(pending.iter().map(|p| p.value.clone()).collect())
            .resolve()
            .await?;

        let entries: Vec<SecretEntry> = pending
            .into_iter()
            .zip(values)
            .map(|(p, value)| SecretEntry {
                name: p.name,
                value,
                content_type: p.content_type,
            })
            .collect();
        let names: Vec<String> = entries.iter().map(|e| e.name.clone()).collect();

        store.set_secrets(&vault.name, entries).await?;
        info!(
            "Committed {} secrets for {} to vault {}",
            names.len(),
            self.owner,
            vault.name
        );

        Ok(CommitReport {
            vault: Some(vault.name.clone()),
            names,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::EnvironmentConfig;
    use crate::store::InMemorySecretStore;
    use azc_output::OutputError;

    fn vault() -> VaultRef {
        VaultRef::new("dev-shared-vlt", &EnvironmentConfig::default())
    }

    #[tokio::test]
    async fn test_commit_writes_single_batch() {
        let store = InMemorySecretStore::new();
        let mut secrets = SecretCollector::new("redis");
        secrets
            .register("Primary Key", "k1")
            .unwrap()
            .register("connection", Output::from_future(async { Ok("c1".to_string()) }))
            .unwrap();

        let report = secrets.commit(Some(&vault()), &store).await.unwrap();

        assert_eq!(report.names, vec!["primary-key", "connection"]);
        assert_eq!(report.vault.as_deref(), Some("dev-shared-vlt"));
        assert_eq!(store.batch_count(), 1);
        let stored = store.get_secret("dev-shared-vlt", "connection").await.unwrap();
        assert_eq!(stored.unwrap().value, "c1");
    }

    #[tokio::test]
    async fn test_reregistering_replaces_in_place() {
        let store = InMemorySecretStore::new();
        let mut secrets = SecretCollector::new("sql");
        secrets.register("a", "1").unwrap();
        secrets.register("b", "2").unwrap();
        secrets.register("A", "3").unwrap();
        assert_eq!(secrets.names(), vec!["a", "b"]);

        secrets.commit(Some(&vault()), &store).await.unwrap();
        let a = store.get_secret("dev-shared-vlt", "a").await.unwrap().unwrap();
        assert_eq!(a.value, "3");
    }

    #[test]
    fn test_unusable_names_rejected_at_register() {
        let mut secrets = SecretCollector::new("orders");

        let err = secrets.register("***", "v").unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfiguration(_)));

        let err = secrets.register(&"k".repeat(128), "v").unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfiguration(_)));

        secrets.register(&"k".repeat(127), "v").unwrap();
        assert_eq!(secrets.len(), 1);
    }

    #[tokio::test]
    async fn test_colliding_raw_names_keep_latest() {
        let store = InMemorySecretStore::new();
        let mut secrets = SecretCollector::new("orders");
        secrets.register("a b", "first").unwrap();
        secrets.register("a_b", "second").unwrap();
        assert_eq!(secrets.names(), vec!["a-b"]);

        secrets.commit(Some(&vault()), &store).await.unwrap();
        let stored = store.get_secret("dev-shared-vlt", "a-b").await.unwrap().unwrap();
        assert_eq!(stored.value, "second");
        assert_eq!(store.names("dev-shared-vlt"), vec!["a-b"]);
    }

    #[tokio::test]
    async fn test_empty_commit_does_not_write() {
        let store = InMemorySecretStore::new();
        let mut secrets = SecretCollector::new("empty");
        let report = secrets.commit(None, &store).await.unwrap();

        assert_eq!(report.written(), 0);
        assert_eq!(store.batch_count(), 0);
    }

    #[tokio::test]
    async fn test_register_after_commit_fails() {
        let store = InMemorySecretStore::new();
        let mut secrets = SecretCollector::new("apim");
        secrets.commit(Some(&vault()), &store).await.unwrap();

        let err = secrets.register("late", "x").unwrap_err();
        assert!(matches!(err, CoreError::AlreadyCommitted(_)));
        assert!(matches!(
            secrets.commit(Some(&vault()), &store).await,
            Err(CoreError::AlreadyCommitted(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_vault_fails_before_resolving() {
        let store = InMemorySecretStore::new();
        let mut secrets = SecretCollector::new("storage");
        secrets.register("key", "v").unwrap();

        let err = secrets.commit(None, &store).await.unwrap_err();
        assert!(matches!(err, CoreError::MissingVault(_)));
        assert_eq!(store.batch_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_value_writes_nothing() {
        let store = InMemorySecretStore::new();
        let mut secrets = SecretCollector::new("bus");
        secrets
            .register("ok", "fine")
            .unwrap()
            .register("broken", Output::<String>::failed(OutputError::MissingKey("primaryKey".into())))
            .unwrap();

        let err = secrets.commit(Some(&vault()), &store).await.unwrap_err();
        assert!(matches!(err, CoreError::Resolution(OutputError::MissingKey(_))));
        assert_eq!(store.batch_count(), 0);
    }

    #[test]
    fn test_register_if() {
        let mut secrets = SecretCollector::new("x");
        secrets
            .register_if(false, "skipped", "1")
            .unwrap()
            .register_if(true, "kept", "2")
            .unwrap();
        assert_eq!(secrets.names(), vec!["kept"]);
    }
}
