//! Deployment environment configuration.
//!
//! Components never read process-wide state to pick defaults. The
//! environment, organization, region and cloud are carried in an
//! [`EnvironmentConfig`] that callers pass in explicitly.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Deployment stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Sandbox,
    Prd,
}

impl Default for Environment {
    fn default() -> Self {
        Self::Dev
    }
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Sandbox => "sandbox",
            Environment::Prd => "prd",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Some(Environment::Dev),
            "sandbox" | "sbx" => Some(Environment::Sandbox),
            "prd" | "prod" | "production" => Some(Environment::Prd),
            _ => None,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Prd)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Azure cloud instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AzureCloud {
    Public,
    China,
    UsGovernment,
}

impl Default for AzureCloud {
    fn default() -> Self {
        Self::Public
    }
}

impl AzureCloud {
    pub fn as_str(&self) -> &'static str {
        match self {
            AzureCloud::Public => "public",
            AzureCloud::China => "china",
            AzureCloud::UsGovernment => "us-government",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "public" | "azurecloud" => Some(AzureCloud::Public),
            "china" | "azurechinacloud" => Some(AzureCloud::China),
            "us-government" | "usgovernment" | "azureusgovernment" => {
                Some(AzureCloud::UsGovernment)
            }
            _ => None,
        }
    }

    /// Host suffix of Service Bus namespaces.
    pub fn service_bus_suffix(&self) -> &'static str {
        match self {
            AzureCloud::Public => "servicebus.windows.net",
            AzureCloud::China => "servicebus.chinacloudapi.cn",
            AzureCloud::UsGovernment => "servicebus.usgovcloudapi.net",
        }
    }

    /// Token audience for Service Bus data-plane calls.
    pub fn service_bus_resource(&self) -> &'static str {
        match self {
            AzureCloud::Public => "https://servicebus.azure.net",
            AzureCloud::China => "https://servicebus.azure.cn",
            AzureCloud::UsGovernment => "https://servicebus.usgovcloudapi.net",
        }
    }

    /// Host suffix of Key Vault instances.
    pub fn vault_suffix(&self) -> &'static str {
        match self {
            AzureCloud::Public => "vault.azure.net",
            AzureCloud::China => "vault.azure.cn",
            AzureCloud::UsGovernment => "vault.usgovcloudapi.net",
        }
    }

    pub fn default_region(&self) -> &'static str {
        match self {
            AzureCloud::Public => "southeastasia",
            AzureCloud::China => "chinaeast2",
            AzureCloud::UsGovernment => "usgovvirginia",
        }
    }
}

impl std::fmt::Display for AzureCloud {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Injected deployment context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default)]
    pub environment: Environment,
    pub organization: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub cloud: AzureCloud,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            organization: "azcomp".to_string(),
            region: None,
            cloud: AzureCloud::default(),
        }
    }
}

impl EnvironmentConfig {
    pub fn new(environment: Environment, organization: impl Into<String>) -> Self {
        Self {
            environment,
            organization: organization.into(),
            ..Default::default()
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_cloud(mut self, cloud: AzureCloud) -> Self {
        self.cloud = cloud;
        self
    }

    /// Region, falling back to the cloud default.
    pub fn region(&self) -> &str {
        self.region
            .as_deref()
            .unwrap_or_else(|| self.cloud.default_region())
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: EnvironmentConfig = serde_yaml::from_str(&content)?;
        debug!("Loaded environment config from {:?}", path);
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_file(&self, path: &Path) -> CoreResult<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Build configuration from `AZC_*` process environment variables.
    pub fn from_env() -> CoreResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from a variable lookup, using defaults for
    /// anything unset.
    pub fn from_lookup<F>(lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("AZC_ENVIRONMENT") {
            config.environment = Environment::from_str(&value).ok_or_else(|| {
                CoreError::InvalidConfiguration(format!("unknown environment '{}'", value))
            })?;
        }
        if let Some(value) = lookup("AZC_ORGANIZATION") {
            if value.trim().is_empty() {
                return Err(CoreError::InvalidConfiguration(
                    "organization must not be empty".to_string(),
                ));
            }
            config.organization = value;
        }
        if let Some(value) = lookup("AZC_CLOUD") {
            config.cloud = AzureCloud::from_str(&value).ok_or_else(|| {
                CoreError::InvalidConfiguration(format!("unknown cloud '{}'", value))
            })?;
        }
        config.region = lookup("AZC_REGION").filter(|r| !r.is_empty());

        Ok(config)
    }
}
