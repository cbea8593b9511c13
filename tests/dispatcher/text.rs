use std::{sync::Arc, time::Duration};

use serde_json::json;

use super::{harness, CountingPort, FailingEngine, HarnessBuilder, ScriptedEngine};

#[tokio::test]
async fn fallback_summary_keeps_first_two_sentences() {
    let harness = harness().await;
    let response = harness
        .send(
            "SUMMARIZE",
            json!({ "text": "This is sentence one. This is sentence two. This is sentence three." }),
        )
        .await;

    assert!(response.success);
    assert_eq!(
        response.result,
        Some(json!("This is sentence one. This is sentence two."))
    );
    assert!(response.processing_time_ms.is_some());
}

#[tokio::test]
async fn prefixed_alias_routes_to_the_same_handler() {
    let harness = harness().await;
    let response = harness
        .send("AI_CORRECT_GRAMMAR", json!({ "text": "i think  so" }))
        .await;

    assert!(response.success);
    assert_eq!(response.result, Some(json!("I think so")));
}

#[tokio::test]
async fn process_text_honours_the_action_label() {
    let port = CountingPort::new(Duration::ZERO, Arc::new(ScriptedEngine("Sharper wording.")));
    let harness = HarnessBuilder::new().port(port.clone()).build().await;

    let response = harness
        .send("PROCESS_TEXT", json!({ "text": "make it nicer", "action": "improve" }))
        .await;
    assert_eq!(response.result, Some(json!("Sharper wording.")));

    let response = harness
        .send("PROCESS_TEXT", json!({ "text": "whatever", "action": "translate" }))
        .await;
    assert!(response.success);
    assert_eq!(port.constructions(), 1);
}

#[tokio::test]
async fn concurrent_first_requests_construct_one_engine() {
    let port = CountingPort::new(
        Duration::from_millis(50),
        Arc::new(ScriptedEngine("Done.")),
    );
    let harness = HarnessBuilder::new().port(port.clone()).build().await;

    let (first, second, third) = tokio::join!(
        harness.send("SUMMARIZE", json!({ "text": "one" })),
        harness.send("CORRECT_GRAMMAR", json!({ "text": "two" })),
        harness.send("GET_CAPABILITY_STATUS", json!({})),
    );

    assert!(first.success && second.success && third.success);
    assert_eq!(port.constructions(), 1);

    let status = harness.send("GET_CAPABILITY_STATUS", json!({})).await;
    assert_eq!(
        status.result,
        Some(json!({ "loaded": true, "loading": false, "engine": "scripted-model", "kind": "primary" }))
    );
}

#[tokio::test]
async fn generation_failure_keeps_timing_and_message() {
    let port = CountingPort::new(Duration::ZERO, Arc::new(FailingEngine));
    let harness = HarnessBuilder::new().port(port).build().await;

    let response = harness
        .send("CORRECT_GRAMMAR", json!({ "text": "broken" }))
        .await;

    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("Failed to correct grammar"));
    assert!(response.processing_time_ms.is_some());
}

#[tokio::test]
async fn missing_text_is_an_operation_failure() {
    let harness = harness().await;
    let response = harness.send("PROCESS_TEXT", json!({ "action": "improve" })).await;

    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("Failed to process text"));
}

#[tokio::test]
async fn state_reports_fallback_engine_after_failed_construction() {
    let harness = harness().await;
    harness.send("SUMMARIZE", json!({ "text": "Warm up the engine." })).await;

    let state = harness.state().await;
    assert_eq!(state["currentModel"]["name"], json!("Rule-based"));
    assert_eq!(state["currentModel"]["loaded"], json!(true));
    assert_eq!(state["currentModel"]["kind"], json!("fallback"));
}
