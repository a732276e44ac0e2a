//! Policy fragment factories.
//!
//! Each factory maps typed arguments to one deferred XML fragment. Values
//! are escaped for their position (attribute or text) once they resolve;
//! nothing here forces a deferred value.

use azc_output::{interpolate, Output};
use serde::{Deserialize, Serialize};

use crate::ip::IpEntry;
use crate::xml::{self, escape_attr};

pub const DEFAULT_RATE_LIMIT_CALLS: u32 = 10;
pub const DEFAULT_RATE_LIMIT_PERIOD: u32 = 10;
pub const DEFAULT_CACHE_DURATION: u32 = 60;
pub const DEFAULT_MOCK_STATUS: u16 = 200;
pub const DEFAULT_MOCK_CONTENT_TYPE: &str = "application/json";
pub const DEFAULT_REWRITE_TEMPLATE: &str = "/";
pub const FORWARD_TIMEOUT_SECONDS: u32 = 120;

/// Context variable receiving the managed identity token.
pub const TOKEN_VARIABLE: &str = "msi-access-token";

/// What to do when the header already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderAction {
    Delete,
    #[default]
    Override,
    Skip,
    Append,
}

impl HeaderAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeaderAction::Delete => "delete",
            HeaderAction::Override => "override",
            HeaderAction::Skip => "skip",
            HeaderAction::Append => "append",
        }
    }
}

/// Header mutation.
#[derive(Debug, Clone)]
pub struct SetHeader {
    pub name: Output<String>,
    pub action: HeaderAction,
    pub value: Option<Output<String>>,
}

impl SetHeader {
    pub fn new(name: impl Into<Output<String>>, action: HeaderAction) -> Self {
        Self {
            name: name.into(),
            action,
            value: None,
        }
    }

    /// Override `name` with `value`.
    pub fn override_value(name: impl Into<Output<String>>, value: impl Into<Output<String>>) -> Self {
        Self::new(name, HeaderAction::Override).with_value(value)
    }

    /// Remove `name`.
    pub fn delete(name: impl Into<Output<String>>) -> Self {
        Self::new(name, HeaderAction::Delete)
    }

    pub fn with_value(mut self, value: impl Into<Output<String>>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Client certificate presented to the backend.
#[derive(Debug, Clone)]
pub enum CertAuth {
    Id {
        certificate_id: Output<String>,
        password: Option<Output<String>>,
    },
    Thumbprint(Output<String>),
}

/// Managed identity token acquisition.
#[derive(Debug, Clone)]
pub struct IdentityAuth {
    pub resource: Output<String>,
    pub client_id: Option<Output<String>>,
    /// Header receiving `Bearer <token>`, if any.
    pub set_header_key: Option<String>,
}

impl IdentityAuth {
    pub fn new(resource: impl Into<Output<String>>) -> Self {
        Self {
            resource: resource.into(),
            client_id: None,
            set_header_key: None,
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<Output<String>>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_header_key(mut self, key: impl Into<String>) -> Self {
        self.set_header_key = Some(key.into());
        self
    }
}

/// Required request header, optionally limited to a set of values.
#[derive(Debug, Clone)]
pub struct CheckHeader {
    pub name: Output<String>,
    pub values: Vec<Output<String>>,
}

impl CheckHeader {
    pub fn new(name: impl Into<Output<String>>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<Output<String>>) -> Self {
        self.values.push(value.into());
        self
    }
}

/// Canned response returned instead of calling the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockResponse {
    pub code: u16,
    pub content_type: String,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            code: DEFAULT_MOCK_STATUS,
            content_type: DEFAULT_MOCK_CONTENT_TYPE.to_string(),
        }
    }
}

impl MockResponse {
    pub fn with_code(mut self, code: u16) -> Self {
        self.code = code;
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

/// Per client-IP call quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub calls: u32,
    pub in_seconds: u32,
    /// Count only 2xx responses against the quota.
    pub success_only: bool,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            calls: DEFAULT_RATE_LIMIT_CALLS,
            in_seconds: DEFAULT_RATE_LIMIT_PERIOD,
            success_only: false,
        }
    }
}

/// What a response rule matches on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCondition {
    /// A policy expression, written unescaped, e.g. `@(context.Response.StatusCode >= 500)`.
    Expression(String),
    /// The status code returned by the backend.
    StatusCode(u16),
}

impl ResponseCondition {
    fn expression(&self) -> String {
        match self {
            ResponseCondition::Expression(expr) => expr.clone(),
            ResponseCondition::StatusCode(code) => {
                format!("@(context.Response.StatusCode == {})", code)
            }
        }
    }
}

/// Status and body sent back to the caller.
#[derive(Debug, Clone)]
pub struct ResponseBody {
    pub code: u16,
    pub body: Output<String>,
}

/// One `when` branch of a response template.
#[derive(Debug, Clone)]
pub struct ResponseRule {
    pub condition: ResponseCondition,
    pub response: ResponseBody,
}

impl ResponseRule {
    pub fn on_status(status: u16, code: u16, body: impl Into<Output<String>>) -> Self {
        Self {
            condition: ResponseCondition::StatusCode(status),
            response: ResponseBody {
                code,
                body: body.into(),
            },
        }
    }

    pub fn when(expression: impl Into<String>, code: u16, body: impl Into<Output<String>>) -> Self {
        Self {
            condition: ResponseCondition::Expression(expression.into()),
            response: ResponseBody {
                code,
                body: body.into(),
            },
        }
    }
}

/// Multi-branch response rewrite.
#[derive(Debug, Clone, Default)]
pub struct ResponseTemplate {
    pub rules: Vec<ResponseRule>,
    pub otherwise: Option<ResponseBody>,
}

impl ResponseTemplate {
    pub fn new(rules: Vec<ResponseRule>) -> Self {
        Self {
            rules,
            otherwise: None,
        }
    }

    pub fn with_otherwise(mut self, code: u16, body: impl Into<Output<String>>) -> Self {
        self.otherwise = Some(ResponseBody {
            code,
            body: body.into(),
        });
        self
    }
}

/// Forward the request body to a Service Bus queue or topic.
#[derive(Debug, Clone)]
pub struct ForwardToBus {
    pub namespace: Output<String>,
    pub queue_or_topic: Output<String>,
    pub client_id: Option<Output<String>>,
    /// Custom broker property headers, in order.
    pub broker_properties: Vec<(String, Output<String>)>,
}

impl ForwardToBus {
    pub fn new(namespace: impl Into<Output<String>>, queue_or_topic: impl Into<Output<String>>) -> Self {
        Self {
            namespace: namespace.into(),
            queue_or_topic: queue_or_topic.into(),
            client_id: None,
            broker_properties: Vec::new(),
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<Output<String>>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Output<String>>) -> Self {
        self.broker_properties.push((name.into(), value.into()));
        self
    }
}

/// Allowed CORS origins.
#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    pub origins: Vec<Output<String>>,
}

impl CorsConfig {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Output<String>>,
    {
        Self {
            origins: origins.into_iter().map(Into::into).collect(),
        }
    }
}

/// Client certificate checks enforced at the end of inbound processing.
#[derive(Debug, Clone, Default)]
pub struct ClientCertRule {
    pub issuer: Option<Output<String>>,
    pub subject: Option<Output<String>>,
    pub thumbprint: Option<Output<String>>,
    /// Check the revocation list as part of chain verification.
    pub verify_revocation: bool,
}

/// `<set-backend-service>` pointing at `base_url`.
pub fn set_backend_service(base_url: &Output<String>) -> Output<String> {
    interpolate!(
        r#"<set-backend-service base-url=""#,
        xml::attr(base_url),
        r#"" />"#
    )
}

/// `<set-header>`; the value element is omitted when there is no value.
pub fn set_header(header: &SetHeader) -> Output<String> {
    let open = interpolate!(
        r#"<set-header name=""#,
        xml::attr(&header.name),
        r#"" exists-action=""#,
        header.action.as_str(),
        r#"""#
    );
    match &header.value {
        Some(value) => interpolate!(open, "><value>", xml::text(value), "</value></set-header>"),
        None => interpolate!(open, " />"),
    }
}

pub fn basic_auth(username: &Output<String>, password: &Output<String>) -> Output<String> {
    interpolate!(
        r#"<authentication-basic username=""#,
        xml::attr(username),
        r#"" password=""#,
        xml::attr(password),
        r#"" />"#
    )
}

pub fn certificate_auth(auth: &CertAuth) -> Output<String> {
    match auth {
        CertAuth::Id {
            certificate_id,
            password,
        } => {
            let password = match password {
                Some(p) => interpolate!(r#" password=""#, xml::attr(p), r#"""#),
                None => Output::known(String::new()),
            };
            interpolate!(
                r#"<authentication-certificate certificate-id=""#,
                xml::attr(certificate_id),
                r#"""#,
                password,
                " />"
            )
        }
        CertAuth::Thumbprint(thumbprint) => interpolate!(
            r#"<authentication-certificate thumbprint=""#,
            xml::attr(thumbprint),
            r#"" />"#
        ),
    }
}

/// `<authentication-managed-identity>` storing the token in [`TOKEN_VARIABLE`].
pub fn identity_auth(auth: &IdentityAuth) -> Output<String> {
    let client_id = match &auth.client_id {
        Some(id) => interpolate!(r#" client-id=""#, xml::attr(id), r#"""#),
        None => Output::known(String::new()),
    };
    interpolate!(
        r#"<authentication-managed-identity resource=""#,
        xml::attr(&auth.resource),
        r#"""#,
        client_id,
        format!(
            r#" output-token-variable-name="{}" ignore-error="false" />"#,
            TOKEN_VARIABLE
        )
    )
}

/// Header carrying the acquired identity token.
pub fn bearer_header(key: &str) -> SetHeader {
    SetHeader::override_value(
        key,
        format!(
            r#"@("Bearer " + (string)context.Variables["{}"])"#,
            TOKEN_VARIABLE
        ),
    )
}

/// `<check-header>` failing with 401; comparison ignores case.
pub fn check_header(check: &CheckHeader) -> Output<String> {
    let name = xml::attr(&check.name);
    let mut parts = vec![interpolate!(
        r#"<check-header name=""#,
        &name,
        r#"" failed-check-httpcode="401" failed-check-error-message="The header "#,
        &name,
        r#" is not found" ignore-case="true">"#
    )];
    parts.extend(
        check
            .values
            .iter()
            .map(|v| interpolate!("<value>", xml::text(v), "</value>")),
    );
    parts.push("</check-header>".into());
    Output::join(parts, "\n")
}

pub fn mock_response(mock: &MockResponse) -> Output<String> {
    Output::known(format!(
        r#"<mock-response status-code="{}" content-type="{}" />"#,
        mock.code,
        escape_attr(&mock.content_type)
    ))
}

pub fn rewrite_uri(template: &Output<String>) -> Output<String> {
    interpolate!(
        r#"<rewrite-uri template=""#,
        xml::attr(template),
        r#"" copy-unmatched-params="true" />"#
    )
}

/// `<rate-limit-by-key>` keyed by client IP.
pub fn rate_limit(limit: &RateLimit) -> Output<String> {
    let increment = if limit.success_only {
        format!(
            r#" increment-condition="{}""#,
            escape_attr("@(context.Response.StatusCode >= 200 && context.Response.StatusCode < 300)")
        )
    } else {
        String::new()
    };
    Output::known(format!(
        r#"<rate-limit-by-key calls="{}" renewal-period="{}" counter-key="@(context.Request.IpAddress)"{} />"#,
        limit.calls, limit.in_seconds, increment
    ))
}

pub fn cache_lookup() -> Output<String> {
    Output::known(
        r#"<cache-lookup vary-by-developer="false" vary-by-developer-groups="false" downstream-caching-type="none" />"#
            .to_string(),
    )
}

pub fn cache_store(duration: u32) -> Output<String> {
    Output::known(format!(r#"<cache-store duration="{}" />"#, duration))
}

/// `<ip-filter action="allow">` over parsed entries.
pub fn ip_filter(entries: &[IpEntry]) -> Output<String> {
    let mut lines = vec![r#"<ip-filter action="allow">"#.to_string()];
    lines.extend(entries.iter().map(|entry| match entry {
        IpEntry::Address(addr) => format!("<address>{}</address>", addr),
        IpEntry::Range { from, to } => {
            format!(r#"<address-range from="{}" to="{}" />"#, from, to)
        }
    }));
    lines.push("</ip-filter>".to_string());
    Output::known(lines.join("\n"))
}

fn return_response(response: &ResponseBody) -> Output<String> {
    interpolate!(
        format!(
            "<return-response>\n<set-status code=\"{}\" />\n<set-body>",
            response.code
        ),
        xml::text(&response.body),
        "</set-body>\n</return-response>"
    )
}

/// `<choose>` returning a status and body per matching branch.
pub fn response_template(template: &ResponseTemplate) -> Output<String> {
    let mut parts: Vec<Output<String>> = vec!["<choose>".into()];
    for rule in &template.rules {
        parts.push(Output::known(format!(
            r#"<when condition="{}">"#,
            escape_attr(&rule.condition.expression())
        )));
        parts.push(return_response(&rule.response));
        parts.push("</when>".into());
    }
    if let Some(otherwise) = &template.otherwise {
        parts.push("<otherwise>".into());
        parts.push(return_response(otherwise));
        parts.push("</otherwise>".into());
    }
    parts.push("</choose>".into());
    Output::join(parts, "\n")
}

/// `<cors>`. Without configuration every origin is allowed and
/// credentials are not.
pub fn cors(config: Option<&CorsConfig>) -> Output<String> {
    let (credentials, origins): (&str, Vec<Output<String>>) = match config {
        Some(config) => (
            "true",
            config
                .origins
                .iter()
                .map(|origin| interpolate!("<origin>", xml::text(origin), "</origin>"))
                .collect(),
        ),
        None => ("false", vec![Output::known("<origin>*</origin>".to_string())]),
    };

    let mut parts: Vec<Output<String>> = vec![
        Output::known(format!(r#"<cors allow-credentials="{}">"#, credentials)),
        "<allowed-origins>".into(),
    ];
    parts.extend(origins);
    parts.extend(
        [
            "</allowed-origins>",
            "<allowed-methods>",
            "<method>*</method>",
            "</allowed-methods>",
            "<allowed-headers>",
            "<header>*</header>",
            "</allowed-headers>",
            "<expose-headers>",
            "<header>*</header>",
            "</expose-headers>",
            "</cors>",
        ]
        .into_iter()
        .map(Output::<String>::from),
    );
    Output::join(parts, "\n")
}

/// Quote a value as a C# string literal inside a policy expression.
fn csharp_literal(value: &Output<String>) -> Output<String> {
    value.map(|v| format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
}

/// Gate returning 403 when any configured certificate check fails.
pub fn client_cert_gate(rule: &ClientCertRule) -> Output<String> {
    let mut checks: Vec<Output<String>> = vec![
        "context.Request.Certificate == null".into(),
        if rule.verify_revocation {
            "!context.Request.Certificate.Verify()".into()
        } else {
            "!context.Request.Certificate.VerifyNoRevocation()".into()
        },
    ];
    if let Some(issuer) = &rule.issuer {
        checks.push(interpolate!(
            "context.Request.Certificate.Issuer != ",
            csharp_literal(issuer)
        ));
    }
    if let Some(subject) = &rule.subject {
        checks.push(interpolate!(
            "context.Request.Certificate.SubjectName.Name != ",
            csharp_literal(subject)
        ));
    }
    if let Some(thumbprint) = &rule.thumbprint {
        checks.push(interpolate!(
            "context.Request.Certificate.Thumbprint.ToUpperInvariant() != ",
            csharp_literal(&thumbprint.map(|t| t.to_uppercase()))
        ));
    }

    let condition = interpolate!("@(", Output::join(checks, " || "), ")");
    interpolate!(
        "<choose>\n<when condition=\"",
        xml::attr(&condition),
        "\">\n<return-response>\n<set-status code=\"403\" reason=\"Invalid client certificate\" />\n</return-response>\n</when>\n</choose>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now(out: Output<String>) -> String {
        out.peek().cloned().expect("fragment should be known")
    }

    #[test]
    fn test_set_header_without_value_is_self_closing() {
        assert_eq!(
            now(set_header(&SetHeader::delete("X-Powered-By"))),
            r#"<set-header name="X-Powered-By" exists-action="delete" />"#
        );
        assert_eq!(
            now(set_header(
                &SetHeader::new("X-Env", HeaderAction::Append).with_value("a<b")
            )),
            r#"<set-header name="X-Env" exists-action="append"><value>a&lt;b</value></set-header>"#
        );
    }

    #[test]
    fn test_certificate_auth_variants() {
        assert_eq!(
            now(certificate_auth(&CertAuth::Thumbprint("ABC".into()))),
            r#"<authentication-certificate thumbprint="ABC" />"#
        );
        assert_eq!(
            now(certificate_auth(&CertAuth::Id {
                certificate_id: "backend-cert".into(),
                password: Some("p&w".into()),
            })),
            r#"<authentication-certificate certificate-id="backend-cert" password="p&amp;w" />"#
        );
    }

    #[test]
    fn test_identity_auth_optional_client_id() {
        let auth = IdentityAuth::new("https://vault.azure.net");
        assert_eq!(
            now(identity_auth(&auth)),
            r#"<authentication-managed-identity resource="https://vault.azure.net" output-token-variable-name="msi-access-token" ignore-error="false" />"#
        );

        let with_id = now(identity_auth(&auth.with_client_id("1234")));
        assert!(with_id.contains(r#"resource="https://vault.azure.net" client-id="1234" output-token"#));
    }

    #[test]
    fn test_check_header_lists_values() {
        let doc = now(check_header(&CheckHeader::new("X-Tenant").with_value("a").with_value("b")));
        assert_eq!(
            doc,
            "<check-header name=\"X-Tenant\" failed-check-httpcode=\"401\" failed-check-error-message=\"The header X-Tenant is not found\" ignore-case=\"true\">\n<value>a</value>\n<value>b</value>\n</check-header>"
        );
    }

    #[test]
    fn test_rate_limit_success_only_condition() {
        let doc = now(rate_limit(&RateLimit {
            success_only: true,
            ..RateLimit::default()
        }));
        assert!(doc.starts_with(r#"<rate-limit-by-key calls="10" renewal-period="10""#));
        assert!(doc.contains(
            r#"increment-condition="@(context.Response.StatusCode &gt;= 200 &amp;&amp; context.Response.StatusCode &lt; 300)""#
        ));
        assert!(!now(rate_limit(&RateLimit::default())).contains("increment-condition"));
    }

    #[test]
    fn test_response_template_branches() {
        let template = ResponseTemplate::new(vec![
            ResponseRule::on_status(404, 404, r#"{"error":"not found"}"#),
            ResponseRule::when("@(context.Response.StatusCode >= 500)", 503, "unavailable"),
        ])
        .with_otherwise(200, "ok");
        let doc = now(response_template(&template));

        assert!(doc.starts_with("<choose>\n<when condition=\"@(context.Response.StatusCode == 404)\">"));
        assert!(doc.contains(r#"<set-body>{"error":"not found"}</set-body>"#));
        assert!(doc.contains(r#"<when condition="@(context.Response.StatusCode &gt;= 500)">"#));
        assert!(doc.contains("<otherwise>\n<return-response>\n<set-status code=\"200\" />"));
        assert!(doc.ends_with("</otherwise>\n</choose>"));
    }

    #[test]
    fn test_empty_response_template_is_well_formed() {
        assert_eq!(now(response_template(&ResponseTemplate::default())), "<choose>\n</choose>");
    }

    #[test]
    fn test_cors_default_is_wildcard_without_credentials() {
        let doc = now(cors(None));
        assert!(doc.starts_with(r#"<cors allow-credentials="false">"#));
        assert!(doc.contains("<allowed-origins>\n<origin>*</origin>\n</allowed-origins>"));
    }

    #[test]
    fn test_client_cert_gate_escapes_literals() {
        let doc = now(client_cert_gate(&ClientCertRule {
            issuer: Some(r#"CN=Contoso "CA""#.into()),
            thumbprint: Some("ab12".into()),
            verify_revocation: true,
            ..ClientCertRule::default()
        }));

        assert!(doc.contains("context.Request.Certificate == null || !context.Request.Certificate.Verify()"));
        assert!(doc.contains(
            r#"context.Request.Certificate.Issuer != &quot;CN=Contoso \&quot;CA\&quot;&quot;"#
        ));
        assert!(doc.contains(r#"Thumbprint.ToUpperInvariant() != &quot;AB12&quot;"#));
        assert!(doc.contains(r#"<set-status code="403" reason="Invalid client certificate" />"#));
        assert!(!doc.contains("SubjectName"));
    }
}
