use serde_json::json;

use super::{harness, Harness, HarnessBuilder, StubReporter};

async fn set_recipient(harness: &Harness, address: &str) {
    let response = harness
        .send(
            "UPDATE_SETTINGS",
            json!({ "emailReports": { "enabled": true, "recipientEmail": address } }),
        )
        .await;
    assert!(response.success);
}

#[tokio::test]
async fn report_goes_to_configured_recipient() {
    let reporter = StubReporter::new(true);
    let harness = HarnessBuilder::new().reporter(reporter.clone()).build().await;
    set_recipient(&harness, "me@example.com").await;

    let response = harness.send("SEND_EMAIL_REPORT", json!({})).await;
    assert!(response.success, "{response:?}");
    assert_eq!(
        reporter.sent_to.lock().unwrap().as_slice(),
        ["me@example.com".to_string()]
    );
}

#[tokio::test]
async fn undelivered_report_is_a_failure() {
    let harness = HarnessBuilder::new()
        .reporter(StubReporter::new(false))
        .build()
        .await;
    set_recipient(&harness, "me@example.com").await;

    let response = harness.send("SEND_EMAIL_REPORT", json!({})).await;
    assert!(!response.success);
    assert_eq!(
        response.error.as_deref(),
        Some("Failed to generate email report")
    );
}

#[tokio::test]
async fn report_needs_a_recipient() {
    let reporter = StubReporter::new(true);
    let harness = HarnessBuilder::new().reporter(reporter.clone()).build().await;

    // No recipient out of the box.
    let response = harness.send("SEND_EMAIL_REPORT", json!({})).await;
    assert_eq!(
        response.error.as_deref(),
        Some("No report recipient configured")
    );

    set_recipient(&harness, "   ").await;
    let response = harness.send("SEND_EMAIL_REPORT", json!({})).await;
    assert_eq!(
        response.error.as_deref(),
        Some("No report recipient configured")
    );
    assert!(reporter.sent_to.lock().unwrap().is_empty());
}

#[tokio::test]
async fn outbox_reporter_writes_a_message_file() {
    let harness = harness().await;
    set_recipient(&harness, "me@example.com").await;
    let response = harness.send("SEND_EMAIL_REPORT", json!({})).await;

    assert!(response.success, "{response:?}");
    assert_eq!(response.result, Some(json!("Email report sent")));
}
