//! Component resources.
//!
//! A component groups the low-level resource declarations it makes, the
//! secrets it produces and the outputs it exposes. Declaring is synchronous;
//! secrets are committed once by [`ComponentResource::finalize`].

use std::collections::BTreeMap;

use azc_output::Output;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::certificate::CertificateSource;
use crate::endpoint::PrivateEndpointKind;
use crate::environment::EnvironmentConfig;
use crate::error::{CoreError, CoreResult};
use crate::naming::{resource_name, ResourceKind};
use crate::secrets::{CommitReport, SecretCollector};
use crate::store::SecretStore;
use crate::vault::VaultRef;

/// A low-level resource request handed to the host engine.
#[derive(Debug, Clone)]
pub struct ResourceDeclaration {
    /// Provider type token, e.g. `azure-native:network:PrivateEndpoint`.
    pub kind: String,
    /// Logical resource name.
    pub name: String,
    /// Resource properties, possibly depending on unresolved values.
    pub properties: Output<Value>,
}

/// Outputs of a finalized component.
#[derive(Debug, Clone)]
pub struct ComponentOutputs {
    pub name: String,
    pub declarations: Vec<ResourceDeclaration>,
    pub outputs: BTreeMap<String, Output<String>>,
    pub secrets: CommitReport,
}

/// Base for every component resource.
#[derive(Debug)]
pub struct ComponentResource {
    name: String,
    config: EnvironmentConfig,
    vault: Option<VaultRef>,
    declarations: Vec<ResourceDeclaration>,
    outputs: BTreeMap<String, Output<String>>,
    secrets: SecretCollector,
}

impl ComponentResource {
    pub fn new(name: impl Into<String>, config: EnvironmentConfig) -> Self {
        let name = name.into();
        Self {
            secrets: SecretCollector::new(name.clone()),
            name,
            config,
            vault: None,
            declarations: Vec::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// Vault that receives this component's secrets.
    pub fn with_vault(mut self, vault: VaultRef) -> Self {
        self.vault = Some(vault);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    pub fn vault(&self) -> Option<&VaultRef> {
        self.vault.as_ref()
    }

    pub fn declarations(&self) -> &[ResourceDeclaration] {
        &self.declarations
    }

    pub fn secrets(&self) -> &SecretCollector {
        &self.secrets
    }

    /// Conventional name for a resource of `kind` owned by this component.
    pub fn resource_name(&self, kind: ResourceKind) -> String {
        resource_name(&self.config, kind, &self.name)
    }

    /// Record a resource declaration.
    pub fn declare(
        &mut self,
        kind: impl Into<String>,
        name: impl Into<String>,
        properties: Output<Value>,
    ) -> &mut Self {
        let declaration = ResourceDeclaration {
            kind: kind.into(),
            name: name.into(),
            properties,
        };
        debug!(
            "{} declares {} {}",
            self.name, declaration.kind, declaration.name
        );
        self.declarations.push(declaration);
        self
    }

    /// Declare a private endpoint for the resource `resource_id`.
    ///
    /// Unknown type tags fail immediately.
    pub fn add_private_endpoint(
        &mut self,
        tag: &str,
        resource_id: Output<String>,
        subnet_id: Output<String>,
    ) -> CoreResult<&mut Self> {
        let kind = PrivateEndpointKind::from_tag(tag)?;
        let name = format!(
            "{}-{}",
            self.resource_name(ResourceKind::PrivateEndpoint),
            kind.group_id().to_lowercase()
        );
        let location = self.config.region().to_string();
        let dns_zone = kind.dns_zone(self.config.cloud);

        let properties = Output::all(vec![resource_id, subnet_id]).map(move |ids| {
            json!({
                "location": location,
                "subnet": { "id": ids[1] },
                "privateLinkServiceConnections": [{
                    "name": kind.group_id(),
                    "privateLinkServiceId": ids[0],
                    "groupIds": [kind.group_id()],
                }],
                "privateDnsZone": dns_zone,
            })
        });

        Ok(self.declare("azure-native:network:PrivateEndpoint", name, properties))
    }

    /// Register a secret for the final commit.
    pub fn add_secret(
        &mut self,
        name: &str,
        value: impl Into<Output<String>>,
    ) -> CoreResult<&mut Self> {
        self.secrets.register(name, value)?;
        Ok(self)
    }

    /// Make a certificate available through the vault and return its
    /// secret identifier.
    ///
    /// Inline material is registered as a secret named `name` (plus
    /// `{name}-password` when a password is given). Fails immediately when
    /// the component has no vault.
    pub fn add_certificate(
        &mut self,
        name: &str,
        source: &CertificateSource,
    ) -> CoreResult<Output<String>> {
        match source {
            CertificateSource::Vault { .. } => source
                .key_vault_secret_id(self.vault.as_ref())?
                .ok_or_else(|| CoreError::InvalidConfiguration(name.to_string())),
            CertificateSource::Inline {
                kind,
                data,
                password,
            } => {
                let vault = self.vault.clone().ok_or_else(|| {
                    CoreError::MissingVault(format!("certificate '{}'", name))
                })?;
                self.secrets
                    .register_with_content_type(name, data, kind.content_type())?;
                if let Some(password) = password {
                    self.secrets
                        .register(&format!("{}-password", name), password)?;
                }
                Ok(vault.secret_id(name))
            }
        }
    }

    /// Expose a named output.
    pub fn register_output(&mut self, name: impl Into<String>, value: Output<String>) -> &mut Self {
        self.outputs.insert(name.into(), value);
        self
    }

    /// Commit collected secrets in one batch and hand back the outputs.
    pub async fn finalize(mut self, store: &dyn SecretStore) -> CoreResult<ComponentOutputs> {
        let secrets = self.secrets.commit(self.vault.as_ref(), store).await?;
        info!(
            "Finalized component {} ({} declarations, {} secrets)",
            self.name,
            self.declarations.len(),
            secrets.written()
        );

        Ok(ComponentOutputs {
            name: self.name,
            declarations: self.declarations,
            outputs: self.outputs,
            secrets,
        })
    }
}
