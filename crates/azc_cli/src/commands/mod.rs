//! CLI command definitions.
//!
//! Each subcommand group maps to one library surface: policy documents,
//! environment configuration and the secret commit.

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use azc_core::EnvironmentConfig;

pub mod env;
pub mod policy;
pub mod secrets;

/// azcomp - Azure infrastructure components
#[derive(Parser)]
#[command(name = "azc")]
#[command(version, about = "azcomp - Azure infrastructure components")]
#[command(long_about = r#"
azcomp builds Azure infrastructure components: API Management policy
documents, environment-aware resource names and batched Key Vault secrets.

COMMANDS:
  policy render   → Render a YAML policy spec to a policy document
  env show        → Show the resolved environment and resource names
  secrets commit  → Register secrets and commit them in one batch

ENVIRONMENT:
  AZC_ENVIRONMENT, AZC_ORGANIZATION, AZC_CLOUD, AZC_REGION
  are read when no --env-file is given.

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation or configuration failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Work with API Management policies
    #[command(subcommand)]
    Policy(policy::PolicyCommand),

    /// Inspect the deployment environment
    #[command(subcommand)]
    Env(env::EnvCommand),

    /// Commit secrets to a vault
    #[command(subcommand)]
    Secrets(secrets::SecretsCommand),
}

/// Load the environment from `env_file`, or from `AZC_*` variables.
pub fn load_config(env_file: Option<&Path>) -> Result<EnvironmentConfig> {
    match env_file {
        Some(path) => {
            debug!("Loading environment from {}", path.display());
            EnvironmentConfig::from_file(path)
                .with_context(|| format!("Failed to load environment file {}", path.display()))
        }
        None => EnvironmentConfig::from_env().context("Failed to read AZC_* environment"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_policy_render() {
        let cli = Cli::try_parse_from(["azc", "policy", "render", "--file", "p.yaml"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Policy(policy::PolicyCommand::Render(_))
        ));
    }

    #[test]
    fn test_secrets_commit_requires_vault() {
        assert!(Cli::try_parse_from(["azc", "secrets", "commit", "--file", "s.yaml"]).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("env.yaml");
        std::fs::write(&path, "environment: prd\norganization: contoso\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.organization, "contoso");
        assert!(config.environment.is_production());
    }
}
