use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;

use super::{harness, BrokenCamera, HarnessBuilder};

const PNG: &str = "data:image/png;base64,iVBORw0KGgo=";

#[tokio::test]
async fn settings_update_replaces_nested_blocks_wholesale() {
    let harness = harness().await;
    let response = harness
        .send("UPDATE_SETTINGS", json!({ "emailReports": { "enabled": true } }))
        .await;
    assert!(response.success);

    let state = harness.state().await;
    assert_eq!(state["settings"]["emailReports"], json!({ "enabled": true }));
    assert_eq!(state["settings"]["aiEnabled"], json!(true));

    let persisted = harness.persisted("settings").await.unwrap();
    assert!(persisted["emailReports"].get("recipientEmail").is_none());
}

#[tokio::test]
async fn invalid_settings_update_is_rejected() {
    let harness = harness().await;
    let response = harness
        .send("UPDATE_SETTINGS", json!({ "activityTracking": "sometimes" }))
        .await;

    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("Failed to update settings"));
    assert_eq!(harness.state().await["settings"]["activityTracking"], json!(true));
}

#[tokio::test]
async fn logging_prunes_with_live_retention() {
    let stale = Utc::now() - Duration::days(2);
    let harness = HarnessBuilder::new()
        .seed(
            "activityLogs",
            json!([{ "id": "old", "timestamp": stale.timestamp_millis(), "type": "navigation" }]),
        )
        .build()
        .await;
    assert_eq!(harness.state().await["activityCount"], json!(1));

    harness
        .send("UPDATE_SETTINGS", json!({ "privacy": { "dataRetentionDays": 1 } }))
        .await;
    let response = harness
        .send("LOG_ACTIVITY", json!({ "type": "text_input", "url": "https://example.com" }))
        .await;
    assert!(response.success);

    assert_eq!(harness.state().await["activityCount"], json!(1));
    let persisted = harness.persisted("activityLogs").await.unwrap();
    assert_eq!(persisted.as_array().unwrap().len(), 1);
    assert_eq!(persisted[0]["type"], json!("text_input"));
    assert_ne!(persisted[0]["id"], json!("old"));
}

#[tokio::test]
async fn logging_while_tracking_is_off_is_refused() {
    let harness = harness().await;
    harness
        .send("UPDATE_SETTINGS", json!({ "activityTracking": false }))
        .await;

    let response = harness.send("LOG_ACTIVITY", json!({ "type": "navigation" })).await;
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("Activity tracking disabled"));
    assert_eq!(harness.state().await["activityCount"], json!(0));
}

#[tokio::test]
async fn capture_registers_screenshot_and_activity() {
    let harness = harness().await;
    let response = harness
        .send(
            "CAPTURE_SCREENSHOT",
            json!({ "tab": { "id": 3, "url": "https://news.example", "title": "News" }, "dataUrl": PNG }),
        )
        .await;

    assert!(response.success, "{response:?}");
    let screenshot_id = response.result.unwrap();

    let state = harness.state().await;
    assert_eq!(state["screenshotCount"], json!(1));
    assert_eq!(state["activityCount"], json!(1));

    let activity = harness.persisted("activityLogs").await.unwrap();
    assert_eq!(activity[0]["type"], json!("screenshot"));
    assert_eq!(activity[0]["metadata"]["screenshotId"], screenshot_id);

    let screenshots = harness.persisted("screenshots").await.unwrap();
    assert_eq!(screenshots[0]["title"], json!("News"));
}

#[tokio::test]
async fn capture_without_tab_or_when_disabled_is_refused() {
    let harness = harness().await;
    let response = harness.send("CAPTURE_SCREENSHOT", json!({ "dataUrl": PNG })).await;
    assert_eq!(
        response.error.as_deref(),
        Some("Screenshot capture disabled or no tab")
    );

    harness
        .send("UPDATE_SETTINGS", json!({ "screenshotCapture": false }))
        .await;
    let response = harness
        .send("CAPTURE_SCREENSHOT", json!({ "tab": { "id": 1 }, "dataUrl": PNG }))
        .await;
    assert_eq!(
        response.error.as_deref(),
        Some("Screenshot capture disabled or no tab")
    );
    assert_eq!(harness.state().await["screenshotCount"], json!(0));
}

#[tokio::test]
async fn collaborator_failure_maps_to_capture_message() {
    let harness = HarnessBuilder::new()
        .screenshot_source(Arc::new(BrokenCamera))
        .build()
        .await;
    let response = harness
        .send("CAPTURE_SCREENSHOT", json!({ "tab": { "id": 1 } }))
        .await;

    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("Failed to capture screenshot"));
}

#[tokio::test]
async fn todo_is_generated_from_content() {
    let harness = harness().await;
    let response = harness
        .send(
            "GENERATE_TODO",
            json!({
                "content": "Review the quarterly budget draft. Send comments to finance by Friday. Ignore this.",
                "context": { "url": "https://docs.example/budget", "title": "Budget" }
            }),
        )
        .await;
    assert!(response.success, "{response:?}");
    let todo_id = response.result.unwrap();

    assert_eq!(harness.state().await["todoCount"], json!(1));
    let todos = harness.persisted("todos").await.unwrap();
    assert_eq!(todos[0]["id"], todo_id);
    assert_eq!(
        todos[0]["title"],
        json!("Review the quarterly budget draft. Send comments to finance by Friday.")
    );
    assert_eq!(todos[0]["sourceUrl"], json!("https://docs.example/budget"));
    assert_eq!(todos[0]["completed"], json!(false));
}

#[tokio::test]
async fn empty_todo_content_is_refused() {
    let harness = harness().await;
    let response = harness
        .send("GENERATE_TODO", json!({ "content": "   ", "context": {} }))
        .await;

    assert_eq!(response.error.as_deref(), Some("Nothing to turn into a todo"));
    assert_eq!(harness.state().await["todoCount"], json!(0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_writes_persist_the_latest_collection() {
    for _ in 0..10 {
        let harness = harness().await;

        let tasks: Vec<_> = (0..64)
            .map(|n| {
                let dispatcher = harness.dispatcher.clone();
                tokio::spawn(async move {
                    let kind = if n % 2 == 0 { "LOG_ACTIVITY" } else { "GENERATE_TODO" };
                    let payload = if n % 2 == 0 {
                        json!({ "type": "navigation", "url": format!("https://example.com/{n}") })
                    } else {
                        json!({ "content": format!("Follow up on ticket number {n} today.") })
                    };
                    dispatcher
                        .dispatch(tabpilot_lib::dispatch::Request::new(kind, payload))
                        .await
                })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap().success);
        }

        let coordinator = harness.dispatcher.coordinator();
        coordinator.flush().await;

        let activities = harness.backing.value("activityLogs").await.unwrap();
        let todos = harness.backing.value("todos").await.unwrap();
        let state = harness.backing.value("state").await.unwrap();
        assert_eq!(activities.as_array().unwrap().len(), coordinator.activity.count());
        assert_eq!(todos.as_array().unwrap().len(), coordinator.todos.count());
        assert_eq!(coordinator.activity.count(), 32);
        assert_eq!(coordinator.todos.count(), 32);
        assert_eq!(
            state["totalInteractions"],
            json!(coordinator.runtime_state().total_interactions)
        );
    }
}

#[tokio::test]
async fn captured_screenshots_can_be_tagged() {
    let harness = harness().await;
    let captured = harness
        .send(
            "CAPTURE_SCREENSHOT",
            json!({ "tab": { "id": 4, "url": "https://rust-lang.org" }, "dataUrl": PNG }),
        )
        .await;
    let screenshot_id = captured.result.unwrap();

    let response = harness
        .send(
            "TAG_SCREENSHOT",
            json!({ "screenshotId": screenshot_id, "tags": ["docs", " docs ", "rust"] }),
        )
        .await;
    assert!(response.success, "{response:?}");
    assert_eq!(response.result, Some(json!(["docs", "rust"])));

    let screenshots = harness.persisted("screenshots").await.unwrap();
    assert_eq!(screenshots[0]["tags"], json!(["docs", "rust"]));

    let missing = harness
        .send("TAG_SCREENSHOT", json!({ "screenshotId": "nope", "tags": ["x"] }))
        .await;
    assert_eq!(missing.error.as_deref(), Some("Screenshot not found"));
}
