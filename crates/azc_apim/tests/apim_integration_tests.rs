//! Integration tests for policy documents.

use std::time::Duration;

use azc_apim::{
    ClientCertRule, CorsConfig, ForwardToBus, MockResponse, PolicyBuilder, PolicyError,
    PolicySpec, RateLimit, ResponseRule, ResponseTemplate, SetHeader,
};
use azc_core::{AzureCloud, Environment, EnvironmentConfig};
use azc_output::{Output, OutputError};
use tempfile::tempdir;

fn provisioned(value: &str, ms: u64) -> Output<String> {
    let value = value.to_string();
    Output::from_future(async move {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(value)
    })
}

fn section<'a>(doc: &'a str, name: &str) -> &'a str {
    let open = format!("<{}>", name);
    let close = format!("</{}>", name);
    let start = doc.find(&open).expect("section open") + open.len();
    let end = doc.find(&close).expect("section close");
    &doc[start..end]
}

#[tokio::test]
async fn test_fragments_keep_call_order() {
    let mut policy = PolicyBuilder::default();
    policy
        .set_header(SetHeader::override_value("X-First", "1"))
        .rewrite_uri("/v2")
        .set_header(SetHeader::override_value("X-Last", "2"));

    let doc = policy.build().resolve().await.unwrap();
    let inbound = section(&doc, "inbound");

    let first = inbound.find("X-First").unwrap();
    let rewrite = inbound.find("<rewrite-uri").unwrap();
    let last = inbound.find("X-Last").unwrap();
    assert!(first < rewrite && rewrite < last);
    assert!(inbound.starts_with("\n<base />\n"));
}

#[tokio::test]
async fn test_base_url_document_shape() {
    let mut policy = PolicyBuilder::default();
    policy.set_base_url("https://orders.internal.contoso.com");

    let doc = policy.build().resolve().await.unwrap();

    assert_eq!(doc.matches("<set-backend-service").count(), 1);
    assert!(doc.contains(r#"<set-backend-service base-url="https://orders.internal.contoso.com" />"#));
    assert!(section(&doc, "backend").contains("<forward-request timeout=\"120\""));

    let outbound = section(&doc, "outbound");
    for header in [
        "Strict-Transport-Security",
        "X-XSS-Protection",
        "Content-Security-Policy",
        "X-Frame-Options",
        "X-Content-Type-Options",
        "Expect-CT",
        "Cache-Control",
    ] {
        assert!(
            outbound.contains(&format!(r#"<set-header name="{}" exists-action="override">"#, header)),
            "missing {header}"
        );
    }
    assert!(outbound.contains(r#"<set-header name="X-Powered-By" exists-action="delete" />"#));
    assert!(outbound.contains(r#"<set-header name="X-AspNet-Version" exists-action="delete" />"#));
    assert_eq!(section(&doc, "on-error"), "\n<base />\n");
}

#[tokio::test]
async fn test_mock_response_replaces_forward() {
    let mut policy = PolicyBuilder::default();
    policy.mock_response(MockResponse::default().with_code(201));

    let doc = policy.build().resolve().await.unwrap();

    assert!(section(&doc, "inbound")
        .contains(r#"<mock-response status-code="201" content-type="application/json" />"#));
    assert_eq!(section(&doc, "backend"), "\n<base />\n");
    assert!(!doc.contains("<forward-request"));
}

#[tokio::test]
async fn test_cors_with_origins() {
    let mut policy = PolicyBuilder::default();
    policy.set_cors(CorsConfig::new(["https://foo.com", "https://bar.com"]));

    let doc = policy.build().resolve().await.unwrap();

    assert!(doc.contains(r#"<cors allow-credentials="true">"#));
    let foo = doc.find("<origin>https://foo.com</origin>").unwrap();
    let bar = doc.find("<origin>https://bar.com</origin>").unwrap();
    assert!(foo < bar);
    assert!(!doc.contains("<origin>*</origin>"));
}

#[tokio::test]
async fn test_cors_default_always_rendered() {
    let mut policy = PolicyBuilder::default();
    let doc = policy.build().resolve().await.unwrap();

    assert!(doc.contains(r#"<cors allow-credentials="false">"#));
    assert!(doc.contains("<origin>*</origin>"));
}

#[tokio::test]
async fn test_rate_limit_attributes() {
    let mut policy = PolicyBuilder::default();
    policy.set_rate_limit(RateLimit {
        calls: 5,
        in_seconds: 10,
        success_only: false,
    });

    let doc = policy.build().resolve().await.unwrap();
    assert!(doc.contains(
        r#"<rate-limit-by-key calls="5" renewal-period="10" counter-key="@(context.Request.IpAddress)" />"#
    ));
}

#[tokio::test]
async fn test_whitelist_expands_cidr() {
    let mut policy = PolicyBuilder::default();
    policy
        .set_whitelist_ips(&["10.0.0.0/24", "192.168.1.10"])
        .unwrap();

    let doc = policy.build().resolve().await.unwrap();
    assert!(doc.contains(
        "<ip-filter action=\"allow\">\n<address-range from=\"10.0.0.0\" to=\"10.0.0.255\" />\n<address>192.168.1.10</address>\n</ip-filter>"
    ));
}

#[test]
fn test_whitelist_rejects_invalid_entry() {
    let mut policy = PolicyBuilder::default();
    let result = policy.set_whitelist_ips(&["300.0.0.1"]);
    assert!(matches!(result, Err(PolicyError::InvalidAddress(_))));
}

#[tokio::test]
async fn test_second_build_duplicates_singletons() {
    let mut policy = PolicyBuilder::default();
    policy
        .set_cors(CorsConfig::new(["https://foo.com"]))
        .verify_client_cert(ClientCertRule::default());

    let first = policy.build().resolve().await.unwrap();
    let second = policy.build().resolve().await.unwrap();

    assert_eq!(first.matches("<cors ").count(), 1);
    assert_eq!(first.matches("Invalid client certificate").count(), 1);
    assert_eq!(second.matches("<cors ").count(), 2);
    assert_eq!(second.matches("Invalid client certificate").count(), 2);
}

#[tokio::test]
async fn test_client_cert_gate_is_last_inbound_directive() {
    let mut policy = PolicyBuilder::default();
    policy
        .verify_client_cert(ClientCertRule {
            subject: Some("CN=partner.contoso.com".into()),
            ..ClientCertRule::default()
        })
        .set_base_url("https://orders")
        .set_cache(Some(30));

    let doc = policy.build().resolve().await.unwrap();
    let inbound = section(&doc, "inbound");

    assert!(inbound.ends_with(
        "<set-status code=\"403\" reason=\"Invalid client certificate\" />\n</return-response>\n</when>\n</choose>\n"
    ));
    assert!(inbound.contains(
        r#"context.Request.Certificate.SubjectName.Name != &quot;CN=partner.contoso.com&quot;"#
    ));
    assert!(inbound.find("<cors ").unwrap() < inbound.find("<choose>").unwrap());
}

#[tokio::test]
async fn test_deferred_values_resolve_into_document() {
    let mut policy = PolicyBuilder::default();
    policy
        .set_base_url(provisioned("https://orders-app.azurewebsites.net", 5))
        .set_header(SetHeader::override_value("X-Api-Key", provisioned("k&y", 1)));

    let document = policy.build();
    assert!(!document.is_known());

    let doc = document.resolve().await.unwrap();
    assert!(doc.contains(r#"base-url="https://orders-app.azurewebsites.net""#));
    assert!(doc.contains("<value>k&amp;y</value>"));
}

#[tokio::test]
async fn test_deferred_failure_surfaces_on_resolve() {
    let mut policy = PolicyBuilder::default();
    policy
        .set_base_url(Output::<String>::failed(OutputError::Unresolved(
            "backend url".into(),
        )))
        .rewrite_uri("/v1");

    let document = policy.build();
    let result = document.resolve().await;
    assert_eq!(
        result,
        Err(OutputError::Unresolved("backend url".into()))
    );
}

#[tokio::test]
async fn test_forward_to_bus_uses_cloud_suffix() {
    let config = EnvironmentConfig::new(Environment::Prd, "contoso").with_cloud(AzureCloud::China);
    let mut policy = PolicyBuilder::new(config);
    policy.forward_to_bus(
        ForwardToBus::new("orders-bus", "created")
            .with_client_id("0000-1111")
            .with_property("BrokerProperties", r#"{"Label":"order"}"#),
    );

    let doc = policy.build().resolve().await.unwrap();
    let inbound = section(&doc, "inbound");

    let auth = inbound
        .find(r#"<authentication-managed-identity resource="https://servicebus.azure.cn" client-id="0000-1111""#)
        .unwrap();
    let bearer = inbound.find(r#"<set-header name="Authorization""#).unwrap();
    let base = inbound
        .find(r#"<set-backend-service base-url="https://orders-bus.servicebus.chinacloudapi.cn" />"#)
        .unwrap();
    let rewrite = inbound.find(r#"<rewrite-uri template="/created/messages""#).unwrap();
    let property = inbound
        .find(r#"<set-header name="BrokerProperties" exists-action="override"><value>{"Label":"order"}</value></set-header>"#)
        .unwrap();

    assert!(auth < bearer && bearer < base && base < rewrite && rewrite < property);
}

#[tokio::test]
async fn test_response_template_in_outbound() {
    let mut policy = PolicyBuilder::default();
    policy.set_response(ResponseTemplate::new(vec![ResponseRule::on_status(
        404,
        404,
        "missing",
    )]));

    let doc = policy.build().resolve().await.unwrap();
    let outbound = section(&doc, "outbound");
    let choose = outbound.find("<choose>").unwrap();
    let security = outbound.find("Strict-Transport-Security").unwrap();
    assert!(choose < security);
}

#[tokio::test]
async fn test_spec_file_matches_fluent_chain() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("orders.yaml");
    std::fs::write(
        &path,
        r#"
name: orders-api
description: Orders facade
steps:
  - type: set_base_url
    url: https://orders.internal.contoso.com
  - type: check_header
    name: X-Tenant
    values: [contoso]
  - type: rate_limit
    calls: 5
  - type: whitelist_ips
    ips: ["10.0.0.0/24"]
  - type: cache
    duration: 30
  - type: response
    rules:
      - status: 404
        code: 404
        body: missing
  - type: cors
    origins: [https://app.contoso.com]
  - type: client_cert
    thumbprint: ab12
  - type: mock_response
    enabled: false
"#,
    )
    .unwrap();

    let spec = PolicySpec::from_file(&path).unwrap();
    let from_spec = spec
        .render(EnvironmentConfig::default())
        .unwrap()
        .resolve()
        .await
        .unwrap();

    let mut policy = PolicyBuilder::default();
    policy
        .set_base_url("https://orders.internal.contoso.com")
        .check_header(azc_apim::CheckHeader::new("X-Tenant").with_value("contoso"))
        .set_rate_limit(RateLimit {
            calls: 5,
            ..RateLimit::default()
        });
    policy.set_whitelist_ips(&["10.0.0.0/24"]).unwrap();
    policy
        .set_cache(Some(30))
        .set_response(ResponseTemplate::new(vec![ResponseRule::on_status(
            404, 404, "missing",
        )]))
        .set_cors(CorsConfig::new(["https://app.contoso.com"]))
        .verify_client_cert(ClientCertRule {
            thumbprint: Some("ab12".into()),
            ..ClientCertRule::default()
        });
    let fluent = policy.build().resolve().await.unwrap();

    assert_eq!(from_spec, fluent);
}

#[test]
fn test_spec_roundtrip_through_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("policy.yaml");

    let spec = PolicySpec::from_yaml(
        "name: echo\nsteps:\n  - type: rewrite_uri\n  - type: inbound\n    xml: <trace source=\"echo\" />\n",
    )
    .unwrap();
    spec.to_file(&path).unwrap();

    assert_eq!(PolicySpec::from_file(&path).unwrap(), spec);
}
