//! # azc_core
//!
//! Shared plumbing for azcomp component resources.
//!
//! - **Environment**: explicitly injected deployment context (stage,
//!   organization, region, cloud) instead of ambient globals
//! - **Naming**: resource and Key Vault secret naming conventions
//! - **Secrets**: register-then-commit lifecycle writing one batch per component
//! - **Components**: declarations, private endpoints, certificates and outputs
//!
//! ## Example
//!
//! ```rust,no_run
//! use azc_core::{ComponentResource, EnvironmentConfig, InMemorySecretStore, VaultRef};
//!
//! # async fn demo() -> azc_core::CoreResult<()> {
//! let config = EnvironmentConfig::from_env()?;
//! let vault = VaultRef::new("dev-shared-vlt", &config);
//!
//! let mut redis = ComponentResource::new("cache", config).with_vault(vault);
//! redis.add_secret("primary-key", "...")?;
//! redis.add_secret("connection-string", "...")?;
//!
//! // One write for both secrets.
//! let store = InMemorySecretStore::new();
//! let outputs = redis.finalize(&store).await?;
//! assert_eq!(outputs.secrets.written(), 2);
//! # Ok(())
//! # }
//! ```

pub mod certificate;
pub mod component;
pub mod endpoint;
pub mod environment;
pub mod error;
pub mod naming;
pub mod secrets;
pub mod store;
pub mod vault;

pub use certificate::{CertificateKind, CertificateSource};
pub use component::{ComponentOutputs, ComponentResource, ResourceDeclaration};
pub use endpoint::PrivateEndpointKind;
pub use environment::{AzureCloud, Environment, EnvironmentConfig};
pub use error::{CoreError, CoreResult};
pub use naming::{checked_secret_name, resource_name, secret_name, ResourceKind, MAX_SECRET_NAME_LEN};
pub use secrets::{CommitReport, SecretCollector};
pub use store::{InMemorySecretStore, SecretBatch, SecretEntry, SecretStore};
pub use vault::VaultRef;

pub use azc_output::{interpolate, Output, OutputError};
