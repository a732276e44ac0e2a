//! Env commands - Show the resolved deployment environment.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use azc_core::{resource_name, EnvironmentConfig, ResourceKind};

use super::load_config;

const KINDS: [ResourceKind; 11] = [
    ResourceKind::ResourceGroup,
    ResourceKind::KeyVault,
    ResourceKind::ApiManagement,
    ResourceKind::ServiceBus,
    ResourceKind::Storage,
    ResourceKind::SqlServer,
    ResourceKind::Postgres,
    ResourceKind::Redis,
    ResourceKind::ContainerAppEnvironment,
    ResourceKind::UserAssignedIdentity,
    ResourceKind::PrivateEndpoint,
];

#[derive(Subcommand)]
pub enum EnvCommand {
    /// Show environment, cloud endpoints and resource names
    Show(ShowArgs),
}

#[derive(Args)]
pub struct ShowArgs {
    /// Environment file (YAML); defaults to AZC_* variables
    #[arg(short, long, env = "AZC_ENV_FILE")]
    pub env_file: Option<PathBuf>,

    /// Component name used for the sample resource names
    #[arg(short, long, default_value = "shared")]
    pub name: String,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct EnvReport {
    environment: String,
    organization: String,
    region: String,
    cloud: String,
    service_bus_suffix: String,
    vault_suffix: String,
    names: Vec<NameEntry>,
}

#[derive(Debug, Serialize)]
struct NameEntry {
    kind: ResourceKind,
    name: String,
}

impl EnvReport {
    fn new(config: &EnvironmentConfig, component: &str) -> Self {
        Self {
            environment: config.environment.to_string(),
            organization: config.organization.clone(),
            region: config.region().to_string(),
            cloud: config.cloud.to_string(),
            service_bus_suffix: config.cloud.service_bus_suffix().to_string(),
            vault_suffix: config.cloud.vault_suffix().to_string(),
            names: KINDS
                .iter()
                .map(|kind| NameEntry {
                    kind: *kind,
                    name: resource_name(config, *kind, component),
                })
                .collect(),
        }
    }
}

pub async fn execute(cmd: EnvCommand) -> Result<()> {
    match cmd {
        EnvCommand::Show(args) => show(args),
    }
}

fn show(args: ShowArgs) -> Result<()> {
    let config = load_config(args.env_file.as_deref())?;
    let report = EnvReport::new(&config, &args.name);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("🌍 Environment");
    println!("   Stage:        {}", report.environment);
    println!("   Organization: {}", report.organization);
    println!("   Region:       {}", report.region);
    println!("   Cloud:        {}", report.cloud);
    println!("   Service Bus:  *.{}", report.service_bus_suffix);
    println!("   Key Vault:    *.{}", report.vault_suffix);
    println!();
    println!("🏷️  Resource names for '{}'", args.name);
    for entry in &report.names {
        println!("   {:<28} {}", format!("{:?}", entry.kind), entry.name);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use azc_core::{AzureCloud, Environment};

    #[test]
    fn test_report_follows_config() {
        let config = EnvironmentConfig::new(Environment::Sandbox, "contoso")
            .with_cloud(AzureCloud::UsGovernment);
        let report = EnvReport::new(&config, "orders");

        assert_eq!(report.environment, "sandbox");
        assert_eq!(report.region, "usgovvirginia");
        assert_eq!(report.names.len(), KINDS.len());
        assert!(report
            .names
            .iter()
            .any(|e| e.kind == ResourceKind::ResourceGroup && e.name == "sandbox-orders-rg"));
    }
}
