//! API Management policy documents.
//!
//! This crate provides:
//! - Fragment factories for individual policy directives
//! - [`PolicyBuilder`], a fluent accumulator with CORS, client certificate
//!   and mock response slots
//! - Document assembly with inherited `<base />` sections and security headers
//! - [`PolicySpec`], a YAML description of builder calls
//!
//! Values may be deferred ([`Output`]); a built document resolves once every
//! value it contains has resolved.

pub mod builder;
pub mod document;
pub mod error;
pub mod fragments;
pub mod ip;
pub mod spec;
pub mod xml;

pub use builder::PolicyBuilder;
pub use error::{PolicyError, PolicyResult};
pub use fragments::{
    CertAuth, CheckHeader, ClientCertRule, CorsConfig, ForwardToBus, HeaderAction, IdentityAuth,
    MockResponse, RateLimit, ResponseBody, ResponseCondition, ResponseRule, ResponseTemplate,
    SetHeader,
};
pub use ip::IpEntry;
pub use spec::{PolicySpec, PolicyStep, StepSpec};

pub use azc_output::Output;
