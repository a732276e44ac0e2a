//! Error types for the core module.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while declaring or finalizing components.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Vault reference required: {0}")]
    MissingVault(String),

    #[error("Unsupported private endpoint type: {0}")]
    UnsupportedEndpointKind(String),

    #[error("Unsupported certificate type: {0}")]
    UnsupportedCertificateKind(String),

    #[error("Secrets already committed for component: {0}")]
    AlreadyCommitted(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Secret store error: {0}")]
    SecretStore(String),

    #[error("Resolution error: {0}")]
    Resolution(#[from] azc_output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
