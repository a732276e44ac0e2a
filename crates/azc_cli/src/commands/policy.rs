//! Policy commands - Render policy documents from YAML specs.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tracing::info;

use azc_apim::PolicySpec;

use super::load_config;

#[derive(Subcommand)]
pub enum PolicyCommand {
    /// Render a policy spec to a policy document
    Render(RenderArgs),
}

#[derive(Args)]
pub struct RenderArgs {
    /// Policy spec (YAML)
    #[arg(short, long)]
    pub file: PathBuf,

    /// Environment file (YAML); defaults to AZC_* variables
    #[arg(short, long, env = "AZC_ENV_FILE")]
    pub env_file: Option<PathBuf>,

    /// Write the document to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn execute(cmd: PolicyCommand) -> Result<()> {
    match cmd {
        PolicyCommand::Render(args) => render(args).await,
    }
}

async fn render(args: RenderArgs) -> Result<()> {
    let config = load_config(args.env_file.as_deref())?;
    let spec = PolicySpec::from_file(&args.file)
        .with_context(|| format!("Failed to load policy spec {}", args.file.display()))?;

    info!(
        "Rendering policy '{}' for {} ({})",
        spec.name, config.environment, config.cloud
    );

    let document = spec
        .render(config)
        .with_context(|| format!("Invalid policy spec '{}'", spec.name))?
        .resolve()
        .await
        .context("Failed to resolve policy document")?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, &document)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote policy document to {}", path.display());
        }
        None => println!("{}", document),
    }

    Ok(())
}
