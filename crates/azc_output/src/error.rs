//! Error types for deferred values.

use thiserror::Error;

/// Result type alias for deferred value resolution.
pub type OutputResult<T> = Result<T, OutputError>;

/// Errors surfaced when a deferred value is resolved.
///
/// Values are shared between every clone of an [`crate::Output`], so the
/// error has to be cheap to clone as well.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OutputError {
    #[error("Upstream value did not resolve: {0}")]
    Unresolved(String),

    #[error("Upstream value has an unexpected shape: {0}")]
    InvalidShape(String),

    #[error("Missing key in upstream value: {0}")]
    MissingKey(String),
}
