//! Policy document assembly.
//!
//! The document always has the same skeleton: `inbound`, `backend`,
//! `outbound` and `on-error`. `inbound`, `outbound` and `on-error` open with
//! `<base />` so that policies inherited from the parent scope run first.
//! `backend` holds exactly one clause: the forward to the origin, or
//! `<base />` when a mock response answers the call.

use azc_output::Output;

use crate::fragments::{self, SetHeader, FORWARD_TIMEOUT_SECONDS};

/// Security headers added to every response.
pub const SECURITY_HEADERS: [(&str, &str); 7] = [
    ("Strict-Transport-Security", "max-age=15724800; includeSubDomains"),
    ("X-XSS-Protection", "1; mode=block"),
    ("Content-Security-Policy", "default-src 'self'"),
    ("X-Frame-Options", "DENY"),
    ("X-Content-Type-Options", "nosniff"),
    ("Expect-CT", "max-age=604800,enforce"),
    ("Cache-Control", "none"),
];

/// Headers that identify the backend stack, removed from every response.
pub const REMOVED_HEADERS: [&str; 2] = ["X-Powered-By", "X-AspNet-Version"];

pub const BASE: &str = "<base />";

/// Backend clause used when no mock response short-circuits the call.
pub fn forward_request() -> String {
    format!(
        r#"<forward-request timeout="{}" follow-redirects="true" fail-on-error-status-code="true" />"#,
        FORWARD_TIMEOUT_SECONDS
    )
}

fn section(name: &str, fragments: Vec<Output<String>>) -> Vec<Output<String>> {
    let mut parts = Vec::with_capacity(fragments.len() + 3);
    parts.push(Output::known(format!("<{}>", name)));
    parts.push(BASE.into());
    parts.extend(fragments);
    parts.push(Output::known(format!("</{}>", name)));
    parts
}

/// Concatenate accumulated fragments into the final document.
///
/// Purely a template over deferred values: it cannot fail itself, but the
/// result fails on resolve if any fragment does.
pub fn assemble(
    inbound: &[Output<String>],
    outbound: &[Output<String>],
    mock_response_active: bool,
) -> Output<String> {
    let backend: Output<String> = if mock_response_active {
        BASE.into()
    } else {
        Output::known(forward_request())
    };

    let mut response = outbound.to_vec();
    response.extend(
        SECURITY_HEADERS
            .iter()
            .map(|(name, value)| fragments::set_header(&SetHeader::override_value(*name, *value))),
    );
    response.extend(
        REMOVED_HEADERS
            .iter()
            .map(|name| fragments::set_header(&SetHeader::delete(*name))),
    );

    let mut parts: Vec<Output<String>> = vec!["<policies>".into()];
    parts.extend(section("inbound", inbound.to_vec()));
    parts.extend(["<backend>".into(), backend, "</backend>".into()]);
    parts.extend(section("outbound", response));
    parts.extend(section("on-error", Vec::new()));
    parts.push("</policies>".into());

    Output::join(parts, "\n")
}
