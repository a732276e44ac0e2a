//! Resource and secret naming conventions.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::environment::EnvironmentConfig;
use crate::error::{CoreError, CoreResult};

/// Resource families that carry a naming suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    ResourceGroup,
    KeyVault,
    ApiManagement,
    ServiceBus,
    Storage,
    SqlServer,
    Postgres,
    Redis,
    ContainerAppEnvironment,
    UserAssignedIdentity,
    PrivateEndpoint,
}

impl ResourceKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            ResourceKind::ResourceGroup => "rg",
            ResourceKind::KeyVault => "vlt",
            ResourceKind::ApiManagement => "apim",
            ResourceKind::ServiceBus => "bus",
            ResourceKind::Storage => "stg",
            ResourceKind::SqlServer => "sql",
            ResourceKind::Postgres => "pgs",
            ResourceKind::Redis => "rds",
            ResourceKind::ContainerAppEnvironment => "cae",
            ResourceKind::UserAssignedIdentity => "uid",
            ResourceKind::PrivateEndpoint => "pep",
        }
    }

    /// Maximum name length accepted by the provider.
    pub fn max_len(&self) -> usize {
        match self {
            ResourceKind::Storage => 24,
            ResourceKind::KeyVault => 24,
            ResourceKind::Redis => 63,
            _ => 80,
        }
    }
}

fn invalid_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("valid naming pattern"))
}

/// Lowercase, replace runs of anything outside `[a-z0-9]` with one dash,
/// and trim dashes at both ends.
fn dashed(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    invalid_chars()
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Build a resource name: `{env}-{name}-{suffix}`.
///
/// Storage accounts only allow lowercase alphanumerics, so dashes are
/// dropped for them. Names longer than the kind allows are truncated.
pub fn resource_name(config: &EnvironmentConfig, kind: ResourceKind, name: &str) -> String {
    let base = dashed(&format!(
        "{}-{}-{}",
        config.environment.as_str(),
        name,
        kind.suffix()
    ));

    let mut result = match kind {
        ResourceKind::Storage => base.replace('-', ""),
        _ => base,
    };
    result.truncate(kind.max_len());
    result.trim_end_matches('-').to_string()
}

/// Longest secret name Key Vault accepts.
pub const MAX_SECRET_NAME_LEN: usize = 127;

/// Normalize a secret name to Key Vault rules.
pub fn secret_name(raw: &str) -> String {
    dashed(raw)
}

/// Normalize a secret name, failing when nothing usable remains or the
/// result is too long for Key Vault.
pub fn checked_secret_name(raw: &str) -> CoreResult<String> {
    let name = secret_name(raw);
    if name.is_empty() {
        return Err(CoreError::InvalidConfiguration(format!(
            "secret name '{}' has no alphanumeric characters",
            raw
        )));
    }
    if name.len() > MAX_SECRET_NAME_LEN {
        return Err(CoreError::InvalidConfiguration(format!(
            "secret name '{}' is longer than {} characters",
            name, MAX_SECRET_NAME_LEN
        )));
    }
    Ok(name)
}
