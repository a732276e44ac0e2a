//! Secrets commands - Register secrets and commit them in one batch.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Deserialize;
use tracing::info;

use azc_core::{CommitReport, InMemorySecretStore, SecretCollector, VaultRef};

use super::load_config;

#[derive(Subcommand)]
pub enum SecretsCommand {
    /// Register every secret in a file and commit them to a vault
    Commit(CommitArgs),
}

#[derive(Args)]
pub struct CommitArgs {
    /// Secrets file (YAML)
    #[arg(short, long)]
    pub file: PathBuf,

    /// Target vault name
    #[arg(long)]
    pub vault: String,

    /// Environment file (YAML); defaults to AZC_* variables
    #[arg(short, long, env = "AZC_ENV_FILE")]
    pub env_file: Option<PathBuf>,
}

/// Secrets file layout.
#[derive(Debug, Deserialize)]
struct SecretsFile {
    #[serde(default = "default_owner")]
    owner: String,
    #[serde(default)]
    secrets: Vec<SecretSpec>,
}

fn default_owner() -> String {
    "cli".to_string()
}

#[derive(Debug, Deserialize)]
struct SecretSpec {
    name: String,
    #[serde(default)]
    value: Option<String>,
    /// Read the value from this environment variable instead.
    #[serde(default)]
    from_env: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
}

impl SecretSpec {
    fn value(&self, lookup: &dyn Fn(&str) -> Option<String>) -> Result<String> {
        match (&self.value, &self.from_env) {
            (Some(value), None) => Ok(value.clone()),
            (None, Some(var)) => lookup(var)
                .with_context(|| format!("Secret '{}': variable {} is not set", self.name, var)),
            _ => anyhow::bail!(
                "Secret '{}': exactly one of 'value' or 'from_env' is required",
                self.name
            ),
        }
    }
}

fn load_secrets(path: &Path) -> Result<SecretsFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read secrets file {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Invalid secrets file {}", path.display()))
}

/// Register the file's secrets and commit them against `store`.
async fn commit_file(
    file: &SecretsFile,
    vault: &VaultRef,
    store: &InMemorySecretStore,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<CommitReport> {
    let mut collector = SecretCollector::new(file.owner.as_str());
    for secret in &file.secrets {
        let value = secret.value(lookup)?;
        match &secret.content_type {
            Some(content_type) => {
                collector.register_with_content_type(&secret.name, value, content_type.as_str())?
            }
            None => collector.register(&secret.name, value)?,
        };
    }

    let report = collector
        .commit(Some(vault), store)
        .await
        .with_context(|| format!("Failed to commit secrets to {}", vault.name))?;
    Ok(report)
}

pub async fn execute(cmd: SecretsCommand) -> Result<()> {
    match cmd {
        SecretsCommand::Commit(args) => commit(args).await,
    }
}

async fn commit(args: CommitArgs) -> Result<()> {
    let config = load_config(args.env_file.as_deref())?;
    let file = load_secrets(&args.file)?;
    let vault = VaultRef::new(args.vault.as_str(), &config);
    let store = InMemorySecretStore::new();

    info!(
        "Committing {} secrets for '{}' to {}",
        file.secrets.len(),
        file.owner,
        vault.name
    );

    let lookup = |key: &str| std::env::var(key).ok();
    let report = commit_file(&file, &vault, &store, &lookup).await?;

    if report.written() == 0 {
        println!("⚠️  No secrets to commit");
        return Ok(());
    }

    println!(
        "🔐 Committed {} secrets to {} in {} batch",
        report.written(),
        vault.name,
        store.batch_count()
    );
    for name in &report.names {
        println!("   - {}", name);
    }

    Ok(())
}
