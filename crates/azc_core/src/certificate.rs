//! Certificate sources.

use azc_output::Output;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::naming::checked_secret_name;
use crate::vault::VaultRef;

/// Certificate encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateKind {
    Pfx,
    Pem,
}

impl CertificateKind {
    pub fn from_tag(tag: &str) -> CoreResult<Self> {
        match tag.to_lowercase().as_str() {
            "pfx" | "pkcs12" | "p12" => Ok(CertificateKind::Pfx),
            "pem" => Ok(CertificateKind::Pem),
            _ => Err(CoreError::UnsupportedCertificateKind(tag.to_string())),
        }
    }

    /// Content type stored alongside the vault secret.
    pub fn content_type(&self) -> &'static str {
        match self {
            CertificateKind::Pfx => "application/x-pkcs12",
            CertificateKind::Pem => "application/x-pem-file",
        }
    }
}

/// Where a certificate comes from.
#[derive(Debug, Clone)]
pub enum CertificateSource {
    /// A certificate already stored in the component's vault.
    Vault { secret_name: String },
    /// Certificate material supplied directly.
    Inline {
        kind: CertificateKind,
        data: Output<String>,
        password: Option<Output<String>>,
    },
}

impl CertificateSource {
    pub fn vault(secret_name: impl Into<String>) -> Self {
        CertificateSource::Vault {
            secret_name: secret_name.into(),
        }
    }

    /// Secret identifier for a vault-backed certificate.
    ///
    /// Fails immediately when the certificate lives in a vault and no vault
    /// reference was given. Inline certificates have no identifier.
    pub fn key_vault_secret_id(&self, vault: Option<&VaultRef>) -> CoreResult<Option<Output<String>>> {
        match self {
            CertificateSource::Vault { secret_name } => {
                let vault = vault.ok_or_else(|| {
                    CoreError::MissingVault(format!("certificate '{}'", secret_name))
                })?;
                let name = checked_secret_name(secret_name)?;
                Ok(Some(vault.secret_id(&name)))
            }
            CertificateSource::Inline { .. } => Ok(None),
        }
    }
}
