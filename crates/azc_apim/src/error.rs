//! Error types for policy building.

use thiserror::Error;

/// Result type alias for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Errors raised synchronously while building a policy.
///
/// Failures of deferred values are not reported here: they surface when the
/// built document is resolved.
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Invalid IP address or range: {0}")]
    InvalidAddress(String),

    #[error("Invalid policy spec: {0}")]
    InvalidSpec(String),

    #[error("Component error: {0}")]
    Core(#[from] azc_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
