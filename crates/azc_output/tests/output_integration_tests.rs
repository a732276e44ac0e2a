//! Integration tests for deferred value composition.

use std::time::Duration;

use azc_output::{interpolate, Output, OutputError};

fn delayed(value: &str, ms: u64) -> Output<String> {
    let value = value.to_string();
    Output::from_future(async move {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(value)
    })
}

#[tokio::test]
async fn test_document_resolves_in_declaration_order() {
    let doc = interpolate!(
        "<a>",
        delayed("slow", 30),
        "</a><b>",
        delayed("fast", 1),
        "</b>"
    );

    assert!(!doc.is_known());
    assert_eq!(doc.resolve().await.unwrap(), "<a>slow</a><b>fast</b>");
}

#[tokio::test]
async fn test_join_with_separator() {
    let lines = Output::join(vec![delayed("one", 5), "two".into(), delayed("three", 1)], "\n");
    assert_eq!(lines.resolve().await.unwrap(), "one\ntwo\nthree");
}

#[tokio::test]
async fn test_failure_surfaces_only_on_resolve() {
    let key: Output<String> = Output::from_future(async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Err(OutputError::MissingKey("secondaryKey".to_string()))
    });

    // Composition itself succeeds.
    let header = interpolate!("Bearer ", &key);
    assert!(!header.is_known());

    let err = header.resolve().await.unwrap_err();
    assert!(err.to_string().contains("secondaryKey"));
}

#[test]
fn test_debug_shows_state() {
    let known = Output::known(1u8);
    let failed: Output<u8> = Output::failed(OutputError::Unresolved("x".to_string()));

    assert_eq!(format!("{:?}", known), "Output::Known(1)");
    assert!(format!("{:?}", failed).starts_with("Output::Failed"));
}
