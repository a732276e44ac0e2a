//! Fluent policy builder.
//!
//! The builder accumulates inbound and outbound fragments in call order and
//! keeps three singleton slots (CORS, client certificate rule, mock flag)
//! that are only rendered by [`PolicyBuilder::build`].
//!
//! # Ownership
//!
//! A builder has one owner that chains calls on `&mut self`. It is not meant
//! to be shared or mutated concurrently.
//!
//! # Example
//!
//! ```rust
//! use azc_apim::{CorsConfig, PolicyBuilder, RateLimit};
//!
//! let mut policy = PolicyBuilder::default();
//! policy
//!     .set_base_url("https://orders.internal.contoso.com")
//!     .set_rate_limit(RateLimit { calls: 5, ..RateLimit::default() })
//!     .set_cors(CorsConfig::new(["https://app.contoso.com"]));
//!
//! let document = policy.build();
//! assert!(document.peek().unwrap().contains(r#"calls="5""#));
//! ```

use azc_core::EnvironmentConfig;
use azc_output::{interpolate, Output};
use tracing::debug;

use crate::document;
use crate::error::PolicyResult;
use crate::fragments::{
    self, CertAuth, CheckHeader, ClientCertRule, CorsConfig, ForwardToBus, IdentityAuth,
    MockResponse, RateLimit, ResponseTemplate, SetHeader, DEFAULT_CACHE_DURATION,
    DEFAULT_REWRITE_TEMPLATE,
};
use crate::ip::IpEntry;

/// Builder for an API Management policy document.
#[derive(Debug, Clone)]
pub struct PolicyBuilder {
    config: EnvironmentConfig,
    inbound: Vec<Output<String>>,
    outbound: Vec<Output<String>>,
    cors: Option<CorsConfig>,
    client_cert: Option<ClientCertRule>,
    mock_response_active: bool,
}

impl Default for PolicyBuilder {
    fn default() -> Self {
        Self::new(EnvironmentConfig::default())
    }
}

impl PolicyBuilder {
    /// Create a builder for the given deployment context.
    pub fn new(config: EnvironmentConfig) -> Self {
        Self {
            config,
            inbound: Vec::new(),
            outbound: Vec::new(),
            cors: None,
            client_cert: None,
            mock_response_active: false,
        }
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    /// Inbound fragments accumulated so far.
    pub fn inbound(&self) -> &[Output<String>] {
        &self.inbound
    }

    /// Outbound fragments accumulated so far.
    pub fn outbound(&self) -> &[Output<String>] {
        &self.outbound
    }

    pub fn is_mock_response_active(&self) -> bool {
        self.mock_response_active
    }

    /// Run `f` against the builder only when `condition` holds.
    pub fn apply_if<F>(&mut self, condition: bool, f: F) -> &mut Self
    where
        F: FnOnce(&mut Self) -> &mut Self,
    {
        if condition {
            f(self);
        }
        self
    }

    /// Append a raw inbound fragment.
    pub fn add_inbound(&mut self, fragment: impl Into<Output<String>>) -> &mut Self {
        self.inbound.push(fragment.into());
        self
    }

    /// Append a raw outbound fragment.
    pub fn add_outbound(&mut self, fragment: impl Into<Output<String>>) -> &mut Self {
        self.outbound.push(fragment.into());
        self
    }

    pub fn set_base_url(&mut self, url: impl Into<Output<String>>) -> &mut Self {
        self.add_inbound(fragments::set_backend_service(&url.into()))
    }

    pub fn set_base_url_if(&mut self, condition: bool, url: impl Into<Output<String>>) -> &mut Self {
        self.apply_if(condition, |b| b.set_base_url(url))
    }

    pub fn set_header(&mut self, header: SetHeader) -> &mut Self {
        self.add_inbound(fragments::set_header(&header))
    }

    pub fn set_header_if(&mut self, condition: bool, header: SetHeader) -> &mut Self {
        self.apply_if(condition, |b| b.set_header(header))
    }

    pub fn set_basic_auth(
        &mut self,
        username: impl Into<Output<String>>,
        password: impl Into<Output<String>>,
    ) -> &mut Self {
        self.add_inbound(fragments::basic_auth(&username.into(), &password.into()))
    }

    pub fn set_cert_auth(&mut self, auth: CertAuth) -> &mut Self {
        self.add_inbound(fragments::certificate_auth(&auth))
    }

    /// Acquire a managed identity token. With a header key the token is
    /// also injected as `Bearer <token>` right after the acquisition.
    pub fn set_identity_auth(&mut self, auth: IdentityAuth) -> &mut Self {
        self.add_inbound(fragments::identity_auth(&auth));
        if let Some(key) = &auth.set_header_key {
            self.set_header(fragments::bearer_header(key));
        }
        self
    }

    pub fn check_header(&mut self, check: CheckHeader) -> &mut Self {
        self.add_inbound(fragments::check_header(&check))
    }

    pub fn check_header_if(&mut self, condition: bool, check: CheckHeader) -> &mut Self {
        self.apply_if(condition, |b| b.check_header(check))
    }

    /// Answer with a canned response; the backend is no longer called.
    pub fn mock_response(&mut self, mock: MockResponse) -> &mut Self {
        self.mock_response_active = true;
        self.add_inbound(fragments::mock_response(&mock))
    }

    pub fn mock_response_if(&mut self, condition: bool, mock: MockResponse) -> &mut Self {
        self.apply_if(condition, |b| b.mock_response(mock))
    }

    pub fn rewrite_uri(&mut self, template: impl Into<Output<String>>) -> &mut Self {
        self.add_inbound(fragments::rewrite_uri(&template.into()))
    }

    /// Rewrite to the default template `/`.
    pub fn rewrite_uri_default(&mut self) -> &mut Self {
        self.rewrite_uri(DEFAULT_REWRITE_TEMPLATE)
    }

    pub fn rewrite_uri_if(&mut self, condition: bool, template: impl Into<Output<String>>) -> &mut Self {
        self.apply_if(condition, |b| b.rewrite_uri(template))
    }

    pub fn set_rate_limit(&mut self, limit: RateLimit) -> &mut Self {
        self.add_inbound(fragments::rate_limit(&limit))
    }

    pub fn set_rate_limit_if(&mut self, condition: bool, limit: RateLimit) -> &mut Self {
        self.apply_if(condition, |b| b.set_rate_limit(limit))
    }

    /// Cache responses for `duration` seconds (lookup inbound, store outbound).
    pub fn set_cache(&mut self, duration: Option<u32>) -> &mut Self {
        self.inbound.push(fragments::cache_lookup());
        self.outbound.push(fragments::cache_store(
            duration.unwrap_or(DEFAULT_CACHE_DURATION),
        ));
        self
    }

    pub fn set_cache_if(&mut self, condition: bool, duration: Option<u32>) -> &mut Self {
        self.apply_if(condition, |b| b.set_cache(duration))
    }

    /// Allow only the listed addresses and CIDR blocks.
    ///
    /// Entries are parsed up front, so an invalid entry fails here and
    /// nothing is appended.
    pub fn set_whitelist_ips<S: AsRef<str>>(&mut self, ips: &[S]) -> PolicyResult<&mut Self> {
        let entries = ips
            .iter()
            .map(|ip| IpEntry::parse(ip.as_ref()))
            .collect::<PolicyResult<Vec<_>>>()?;
        Ok(self.add_inbound(fragments::ip_filter(&entries)))
    }

    pub fn set_whitelist_ips_if<S: AsRef<str>>(
        &mut self,
        condition: bool,
        ips: &[S],
    ) -> PolicyResult<&mut Self> {
        if condition {
            self.set_whitelist_ips(ips)
        } else {
            Ok(self)
        }
    }

    /// Rewrite responses per matching branch.
    pub fn set_response(&mut self, template: ResponseTemplate) -> &mut Self {
        self.add_outbound(fragments::response_template(&template))
    }

    /// Send the request to a Service Bus queue or topic using the managed
    /// identity: token, base URL, URI rewrite, then broker property headers.
    pub fn forward_to_bus(&mut self, forward: ForwardToBus) -> &mut Self {
        let cloud = self.config.cloud;

        let mut auth =
            IdentityAuth::new(cloud.service_bus_resource()).with_header_key("Authorization");
        auth.client_id = forward.client_id;
        self.set_identity_auth(auth);

        self.set_base_url(interpolate!(
            "https://",
            &forward.namespace,
            ".",
            cloud.service_bus_suffix()
        ));
        self.rewrite_uri(interpolate!("/", &forward.queue_or_topic, "/messages"));

        for (name, value) in forward.broker_properties {
            self.set_header(SetHeader::override_value(name, value));
        }
        self
    }

    /// Set the CORS origins. Replaces any earlier configuration.
    pub fn set_cors(&mut self, cors: CorsConfig) -> &mut Self {
        if self.cors.is_some() {
            debug!("Replacing previous CORS configuration");
        }
        self.cors = Some(cors);
        self
    }

    pub fn set_cors_if(&mut self, condition: bool, cors: CorsConfig) -> &mut Self {
        self.apply_if(condition, |b| b.set_cors(cors))
    }

    /// Require a client certificate. Replaces any earlier rule.
    pub fn verify_client_cert(&mut self, rule: ClientCertRule) -> &mut Self {
        if self.client_cert.is_some() {
            debug!("Replacing previous client certificate rule");
        }
        self.client_cert = Some(rule);
        self
    }

    pub fn verify_client_cert_if(&mut self, condition: bool, rule: ClientCertRule) -> &mut Self {
        self.apply_if(condition, |b| b.verify_client_cert(rule))
    }

    /// Render the singleton slots and assemble the document.
    ///
    /// The CORS directive and then the client certificate gate are appended
    /// to the inbound fragments, so the gate is always the last inbound
    /// directive. Building the same builder twice appends them again and the
    /// second document carries duplicated CORS and certificate directives.
    pub fn build(&mut self) -> Output<String> {
        self.inbound.push(fragments::cors(self.cors.as_ref()));
        if let Some(rule) = &self.client_cert {
            let gate = fragments::client_cert_gate(rule);
            self.inbound.push(gate);
        }

        debug!(
            "Building policy with {} inbound and {} outbound fragments (mock: {})",
            self.inbound.len(),
            self.outbound.len(),
            self.mock_response_active
        );
        document::assemble(&self.inbound, &self.outbound, self.mock_response_active)
    }
}
