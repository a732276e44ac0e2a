//! Declarative policy specs.
//!
//! A [`PolicySpec`] lists builder calls as YAML steps so policies can live
//! next to the infrastructure code that uses them:
//!
//! ```yaml
//! name: orders-api
//! steps:
//!   - type: set_base_url
//!     url: https://orders.internal.contoso.com
//!   - type: rate_limit
//!     calls: 5
//!   - type: cors
//!     origins: [https://app.contoso.com]
//!   - type: mock_response
//!     enabled: false
//! ```
//!
//! Steps are applied in order; a step with `enabled: false` is skipped.

use std::path::Path;

use azc_core::EnvironmentConfig;
use azc_output::Output;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::builder::PolicyBuilder;
use crate::error::{PolicyError, PolicyResult};
use crate::fragments::{
    CertAuth, CheckHeader, ClientCertRule, CorsConfig, ForwardToBus, HeaderAction, IdentityAuth,
    MockResponse, RateLimit, ResponseBody, ResponseCondition, ResponseRule, ResponseTemplate,
    SetHeader, DEFAULT_MOCK_CONTENT_TYPE, DEFAULT_MOCK_STATUS, DEFAULT_RATE_LIMIT_CALLS,
    DEFAULT_RATE_LIMIT_PERIOD, DEFAULT_REWRITE_TEMPLATE,
};

/// A named list of policy steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

/// One step and whether it applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSpec {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(flatten)]
    pub step: PolicyStep,
}

fn default_enabled() -> bool {
    true
}

fn default_calls() -> u32 {
    DEFAULT_RATE_LIMIT_CALLS
}

fn default_period() -> u32 {
    DEFAULT_RATE_LIMIT_PERIOD
}

fn default_mock_status() -> u16 {
    DEFAULT_MOCK_STATUS
}

fn default_mock_content_type() -> String {
    DEFAULT_MOCK_CONTENT_TYPE.to_string()
}

fn default_rewrite_template() -> String {
    DEFAULT_REWRITE_TEMPLATE.to_string()
}

/// Builder call described by a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyStep {
    SetBaseUrl {
        url: String,
    },
    SetHeader {
        name: String,
        #[serde(default)]
        action: HeaderAction,
        #[serde(default)]
        value: Option<String>,
    },
    BasicAuth {
        username: String,
        password: String,
    },
    /// Exactly one of `certificate_id` and `thumbprint`.
    CertAuth {
        #[serde(default)]
        certificate_id: Option<String>,
        #[serde(default)]
        password: Option<String>,
        #[serde(default)]
        thumbprint: Option<String>,
    },
    IdentityAuth {
        resource: String,
        #[serde(default)]
        client_id: Option<String>,
        #[serde(default)]
        header: Option<String>,
    },
    CheckHeader {
        name: String,
        #[serde(default)]
        values: Vec<String>,
    },
    MockResponse {
        #[serde(default = "default_mock_status")]
        code: u16,
        #[serde(default = "default_mock_content_type")]
        content_type: String,
    },
    RewriteUri {
        #[serde(default = "default_rewrite_template")]
        template: String,
    },
    RateLimit {
        #[serde(default = "default_calls")]
        calls: u32,
        #[serde(default = "default_period")]
        in_seconds: u32,
        #[serde(default)]
        success_only: bool,
    },
    Cache {
        #[serde(default)]
        duration: Option<u32>,
    },
    WhitelistIps {
        ips: Vec<String>,
    },
    Response {
        #[serde(default)]
        rules: Vec<ResponseRuleSpec>,
        #[serde(default)]
        otherwise: Option<ResponseBodySpec>,
    },
    ForwardToBus {
        namespace: String,
        queue: String,
        #[serde(default)]
        client_id: Option<String>,
        #[serde(default)]
        properties: Vec<BrokerPropertySpec>,
    },
    Cors {
        origins: Vec<String>,
    },
    ClientCert {
        #[serde(default)]
        issuer: Option<String>,
        #[serde(default)]
        subject: Option<String>,
        #[serde(default)]
        thumbprint: Option<String>,
        #[serde(default)]
        verify_revocation: bool,
    },
    /// Raw inbound XML.
    Inbound {
        xml: String,
    },
    /// Raw outbound XML.
    Outbound {
        xml: String,
    },
}

/// Response branch matching either a status code or an expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRuleSpec {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub condition: Option<String>,
    pub code: u16,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseBodySpec {
    pub code: u16,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerPropertySpec {
    pub name: String,
    pub value: String,
}

impl ResponseRuleSpec {
    fn to_rule(&self) -> PolicyResult<ResponseRule> {
        let condition = match (self.status, &self.condition) {
            (Some(status), None) => ResponseCondition::StatusCode(status),
            (None, Some(expr)) => ResponseCondition::Expression(expr.clone()),
            _ => {
                return Err(PolicyError::InvalidSpec(
                    "response rule needs exactly one of 'status' or 'condition'".to_string(),
                ))
            }
        };
        Ok(ResponseRule {
            condition,
            response: ResponseBody {
                code: self.code,
                body: self.body.as_str().into(),
            },
        })
    }
}

fn optional(value: &Option<String>) -> Option<Output<String>> {
    value.as_deref().map(Output::<String>::from)
}

impl PolicyStep {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PolicyStep::SetBaseUrl { .. } => "set_base_url",
            PolicyStep::SetHeader { .. } => "set_header",
            PolicyStep::BasicAuth { .. } => "basic_auth",
            PolicyStep::CertAuth { .. } => "cert_auth",
            PolicyStep::IdentityAuth { .. } => "identity_auth",
            PolicyStep::CheckHeader { .. } => "check_header",
            PolicyStep::MockResponse { .. } => "mock_response",
            PolicyStep::RewriteUri { .. } => "rewrite_uri",
            PolicyStep::RateLimit { .. } => "rate_limit",
            PolicyStep::Cache { .. } => "cache",
            PolicyStep::WhitelistIps { .. } => "whitelist_ips",
            PolicyStep::Response { .. } => "response",
            PolicyStep::ForwardToBus { .. } => "forward_to_bus",
            PolicyStep::Cors { .. } => "cors",
            PolicyStep::ClientCert { .. } => "client_cert",
            PolicyStep::Inbound { .. } => "inbound",
            PolicyStep::Outbound { .. } => "outbound",
        }
    }

    /// Make the corresponding builder call.
    pub fn apply(&self, builder: &mut PolicyBuilder) -> PolicyResult<()> {
        match self {
            PolicyStep::SetBaseUrl { url } => {
                builder.set_base_url(url.as_str());
            }
            PolicyStep::SetHeader {
                name,
                action,
                value,
            } => {
                let mut header = SetHeader::new(name.as_str(), *action);
                header.value = optional(value);
                builder.set_header(header);
            }
            PolicyStep::BasicAuth { username, password } => {
                builder.set_basic_auth(username.as_str(), password.as_str());
            }
            PolicyStep::CertAuth {
                certificate_id,
                password,
                thumbprint,
            } => {
                let auth = match (certificate_id, thumbprint) {
                    (Some(id), None) => CertAuth::Id {
                        certificate_id: id.as_str().into(),
                        password: optional(password),
                    },
                    (None, Some(thumbprint)) => CertAuth::Thumbprint(thumbprint.as_str().into()),
                    _ => {
                        return Err(PolicyError::InvalidSpec(
                            "cert_auth needs exactly one of 'certificate_id' or 'thumbprint'"
                                .to_string(),
                        ))
                    }
                };
                builder.set_cert_auth(auth);
            }
            PolicyStep::IdentityAuth {
                resource,
                client_id,
                header,
            } => {
                let mut auth = IdentityAuth::new(resource.as_str());
                auth.client_id = optional(client_id);
                auth.set_header_key = header.clone();
                builder.set_identity_auth(auth);
            }
            PolicyStep::CheckHeader { name, values } => {
                let check = values
                    .iter()
                    .fold(CheckHeader::new(name.as_str()), |check, v| {
                        check.with_value(v.as_str())
                    });
                builder.check_header(check);
            }
            PolicyStep::MockResponse { code, content_type } => {
                builder.mock_response(
                    MockResponse::default()
                        .with_code(*code)
                        .with_content_type(content_type.clone()),
                );
            }
            PolicyStep::RewriteUri { template } => {
                builder.rewrite_uri(template.as_str());
            }
            PolicyStep::RateLimit {
                calls,
                in_seconds,
                success_only,
            } => {
                builder.set_rate_limit(RateLimit {
                    calls: *calls,
                    in_seconds: *in_seconds,
                    success_only: *success_only,
                });
            }
            PolicyStep::Cache { duration } => {
                builder.set_cache(*duration);
            }
            PolicyStep::WhitelistIps { ips } => {
                builder.set_whitelist_ips(ips.as_slice())?;
            }
            PolicyStep::Response { rules, otherwise } => {
                let rules = rules
                    .iter()
                    .map(ResponseRuleSpec::to_rule)
                    .collect::<PolicyResult<Vec<_>>>()?;
                let mut template = ResponseTemplate::new(rules);
                if let Some(otherwise) = otherwise {
                    template = template.with_otherwise(otherwise.code, otherwise.body.as_str());
                }
                builder.set_response(template);
            }
            PolicyStep::ForwardToBus {
                namespace,
                queue,
                client_id,
                properties,
            } => {
                let mut forward = ForwardToBus::new(namespace.as_str(), queue.as_str());
                forward.client_id = optional(client_id);
                for property in properties {
                    forward = forward.with_property(property.name.clone(), property.value.as_str());
                }
                builder.forward_to_bus(forward);
            }
            PolicyStep::Cors { origins } => {
                builder.set_cors(CorsConfig::new(origins.iter().map(String::as_str)));
            }
            PolicyStep::ClientCert {
                issuer,
                subject,
                thumbprint,
                verify_revocation,
            } => {
                builder.verify_client_cert(ClientCertRule {
                    issuer: optional(issuer),
                    subject: optional(subject),
                    thumbprint: optional(thumbprint),
                    verify_revocation: *verify_revocation,
                });
            }
            PolicyStep::Inbound { xml } => {
                builder.add_inbound(xml.as_str());
            }
            PolicyStep::Outbound { xml } => {
                builder.add_outbound(xml.as_str());
            }
        }
        Ok(())
    }
}

impl PolicySpec {
    /// Parse a spec from YAML text.
    pub fn from_yaml(content: &str) -> PolicyResult<Self> {
        let spec: PolicySpec = serde_yaml::from_str(content)?;
        if spec.name.trim().is_empty() {
            return Err(PolicyError::InvalidSpec("policy name is empty".to_string()));
        }
        Ok(spec)
    }

    /// Load a spec from a YAML file.
    pub fn from_file(path: &Path) -> PolicyResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Save the spec as YAML.
    pub fn to_file(&self, path: &Path) -> PolicyResult<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply the enabled steps in order.
    pub fn apply(&self, builder: &mut PolicyBuilder) -> PolicyResult<()> {
        for (index, step) in self.steps.iter().enumerate() {
            if !step.enabled {
                debug!("Skipping disabled step {} ({})", index, step.step.kind());
                continue;
            }
            step.step.apply(builder)?;
        }
        info!("Applied policy spec '{}' ({} steps)", self.name, self.steps.len());
        Ok(())
    }

    /// Apply the spec to a fresh builder and build the document.
    pub fn render(&self, config: EnvironmentConfig) -> PolicyResult<Output<String>> {
        let mut builder = PolicyBuilder::new(config);
        self.apply(&mut builder)?;
        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let spec = PolicySpec::from_yaml(
            r#"
name: orders
steps:
  - type: rate_limit
  - type: mock_response
    enabled: false
  - type: set_header
    name: X-Env
"#,
        )
        .unwrap();

        assert_eq!(spec.steps.len(), 3);
        assert_eq!(
            spec.steps[0].step,
            PolicyStep::RateLimit {
                calls: 10,
                in_seconds: 10,
                success_only: false
            }
        );
        assert!(!spec.steps[1].enabled);
        assert_eq!(
            spec.steps[2].step,
            PolicyStep::SetHeader {
                name: "X-Env".into(),
                action: HeaderAction::Override,
                value: None
            }
        );
    }

    #[test]
    fn test_disabled_step_is_skipped() {
        let spec = PolicySpec::from_yaml(
            r#"
name: orders
steps:
  - type: mock_response
    code: 201
    enabled: false
"#,
        )
        .unwrap();

        let mut builder = PolicyBuilder::default();
        spec.apply(&mut builder).unwrap();
        assert!(builder.inbound().is_empty());
        assert!(!builder.is_mock_response_active());
    }

    #[test]
    fn test_unknown_step_type_rejected() {
        let result = PolicySpec::from_yaml("name: x\nsteps:\n  - type: teleport\n");
        assert!(matches!(result, Err(PolicyError::Yaml(_))));
    }

    #[test]
    fn test_cert_auth_needs_one_source() {
        let step = PolicyStep::CertAuth {
            certificate_id: Some("id".into()),
            password: None,
            thumbprint: Some("AB".into()),
        };
        let mut builder = PolicyBuilder::default();
        assert!(matches!(
            step.apply(&mut builder),
            Err(PolicyError::InvalidSpec(_))
        ));
    }

    #[test]
    fn test_response_rule_needs_one_matcher() {
        let rule = ResponseRuleSpec {
            status: None,
            condition: None,
            code: 500,
            body: String::new(),
        };
        assert!(rule.to_rule().is_err());
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(matches!(
            PolicySpec::from_yaml("name: ' '\n"),
            Err(PolicyError::InvalidSpec(_))
        ));
    }
}
