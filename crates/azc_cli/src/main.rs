//! azcomp CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Validation or configuration failure

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use azc_apim::PolicyError;
use azc_core::CoreError;

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,azc_cli={level},azc_core={level},azc_apim={level}"
        ))
    });

    // Logging goes to stderr so rendered documents stay pipeable.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let result = match cli.command {
        Commands::Policy(cmd) => commands::policy::execute(cmd).await,
        Commands::Env(cmd) => commands::env::execute(cmd).await,
        Commands::Secrets(cmd) => commands::secrets::execute(cmd).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(err) = cause.downcast_ref::<PolicyError>() {
            return match err {
                PolicyError::Io(_) => ExitCodes::INVALID_ARGS,
                _ => ExitCodes::VALIDATION_FAILURE,
            };
        }
        if let Some(err) = cause.downcast_ref::<CoreError>() {
            return match err {
                CoreError::Io(_) => ExitCodes::INVALID_ARGS,
                CoreError::SecretStore(_) | CoreError::Resolution(_) => ExitCodes::GENERAL_ERROR,
                _ => ExitCodes::VALIDATION_FAILURE,
            };
        }
        if cause.downcast_ref::<std::io::Error>().is_some() {
            return ExitCodes::INVALID_ARGS;
        }
    }
    ExitCodes::GENERAL_ERROR
}
