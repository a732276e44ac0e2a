//! Key Vault references.

use azc_output::{interpolate, Output};

use crate::environment::EnvironmentConfig;
use crate::naming::secret_name as normalized;

/// Reference to the vault a component writes its secrets to.
#[derive(Debug, Clone)]
pub struct VaultRef {
    /// Vault resource name.
    pub name: String,
    /// Vault base URI, ending in `/`.
    pub uri: Output<String>,
}

impl VaultRef {
    /// Reference a vault by name, deriving its URI from the cloud.
    pub fn new(name: impl Into<String>, config: &EnvironmentConfig) -> Self {
        let name = name.into();
        let uri = Output::known(format!("https://{}.{}/", name, config.cloud.vault_suffix()));
        Self { name, uri }
    }

    /// Reference a vault whose URI is only known after provisioning.
    pub fn with_uri(name: impl Into<String>, uri: Output<String>) -> Self {
        Self {
            name: name.into(),
            uri,
        }
    }

    /// Versionless secret identifier for `secret_name`, normalized the
    /// same way registered secrets are.
    pub fn secret_id(&self, secret_name: &str) -> Output<String> {
        interpolate!(&self.uri, "secrets/", normalized(secret_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::AzureCloud;

    #[test]
    fn test_secret_id_for_known_vault() {
        let config = EnvironmentConfig::default().with_cloud(AzureCloud::China);
        let vault = VaultRef::new("dev-shared-vlt", &config);
        assert_eq!(
            vault.secret_id("tls-cert").peek().map(String::as_str),
            Some("https://dev-shared-vlt.vault.azure.cn/secrets/tls-cert")
        );
    }
}
