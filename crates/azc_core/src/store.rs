//! Secret store seam.
//!
//! The collect-then-commit lifecycle writes every secret of a component in
//! one call to a [`SecretStore`]. Production stores talk to Key Vault through
//! the host engine; [`InMemorySecretStore`] keeps everything in process and
//! records each batch for verification.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// A resolved secret ready to be written.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretEntry {
    pub name: String,
    pub value: String,
    pub content_type: Option<String>,
}

impl fmt::Debug for SecretEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretEntry")
            .field("name", &self.name)
            .field("value", &"***")
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Secret store trait.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Write a batch of secrets to `vault` in a single operation.
    async fn set_secrets(&self, vault: &str, secrets: Vec<SecretEntry>) -> CoreResult<()>;

    /// Read a secret back.
    async fn get_secret(&self, vault: &str, name: &str) -> CoreResult<Option<SecretEntry>>;
}

/// Record of one batched write.
#[derive(Debug, Clone)]
pub struct SecretBatch {
    pub vault: String,
    pub names: Vec<String>,
    pub written_at: DateTime<Utc>,
}

/// In-process secret store.
#[derive(Clone, Default)]
pub struct InMemorySecretStore {
    /// Secrets by vault, then by name.
    vaults: Arc<RwLock<HashMap<String, HashMap<String, SecretEntry>>>>,
    /// Every batch written, in order.
    batches: Arc<RwLock<Vec<SecretBatch>>>,
    /// Simulated failure for the next writes.
    simulate_failure: Arc<RwLock<Option<String>>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every write with `message`.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some(message.into());
        self
    }

    /// All batches written so far.
    pub fn batches(&self) -> Vec<SecretBatch> {
        self.batches.read().clone()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.read().len()
    }

    /// Names stored in a vault, sorted.
    pub fn names(&self, vault: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .vaults
            .read()
            .get(vault)
            .map(|secrets| secrets.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn set_secrets(&self, vault: &str, secrets: Vec<SecretEntry>) -> CoreResult<()> {
        if let Some(message) = self.simulate_failure.read().clone() {
            return Err(CoreError::SecretStore(message));
        }

        let names: Vec<String> = secrets.iter().map(|s| s.name.clone()).collect();
        {
            let mut vaults = self.vaults.write();
            let entries = vaults.entry(vault.to_string()).or_default();
            for secret in secrets {
                entries.insert(secret.name.clone(), secret);
            }
        }

        debug!("Stored {} secrets in vault {}", names.len(), vault);
        self.batches.write().push(SecretBatch {
            vault: vault.to_string(),
            names,
            written_at: Utc::now(),
        });
        Ok(())
    }

    async fn get_secret(&self, vault: &str, name: &str) -> CoreResult<Option<SecretEntry>> {
        Ok(self
            .vaults
            .read()
            .get(vault)
            .and_then(|secrets| secrets.get(name))
            .cloned())
    }
}
