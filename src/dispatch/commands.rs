use anyhow::{Context, Result};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::{
    capability::EnhancementResult,
    collaborators::{CaptureTarget, TabInfo},
    models::{new_id, ActivityEntry, ActivityKind, TodoItem},
    runtime::Coordinator,
    stores::LogOutcome,
};

const TODO_TITLE_FALLBACK_CHARS: usize = 80;

/// An expected refusal. Its text goes to the caller verbatim.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct Rejection(pub &'static str);

#[derive(Debug, Deserialize)]
struct TextPayload {
    text: String,
    #[serde(default)]
    action: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagPayload {
    screenshot_id: String,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TodoContext {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TodoPayload {
    #[serde(default)]
    content: String,
    #[serde(default)]
    context: TodoContext,
}

fn text_payload(payload: Value) -> Result<TextPayload> {
    serde_json::from_value(payload).context("text payload must carry a `text` string")
}

pub async fn process_text(coordinator: &Coordinator, payload: Value) -> Result<EnhancementResult> {
    let request = text_payload(payload)?;
    let action = request.action.as_deref().unwrap_or("grammar");
    Ok(coordinator.capability.enhance(&request.text, action).await)
}

pub async fn summarize(coordinator: &Coordinator, payload: Value) -> Result<EnhancementResult> {
    let request = text_payload(payload)?;
    Ok(coordinator.capability.summarize_text(&request.text).await)
}

pub async fn correct_grammar(
    coordinator: &Coordinator,
    payload: Value,
) -> Result<EnhancementResult> {
    let request = text_payload(payload)?;
    Ok(coordinator.capability.correct_grammar(&request.text).await)
}

pub async fn capture_screenshot(coordinator: &Coordinator, payload: Value) -> Result<Value> {
    let target: CaptureTarget = match payload {
        Value::Null => CaptureTarget::default(),
        payload => serde_json::from_value(payload).context("invalid capture target")?,
    };

    let tab: TabInfo = match (&target.tab, coordinator.settings.current().screenshot_capture) {
        (Some(tab), true) => tab.clone(),
        _ => return Err(Rejection("Screenshot capture disabled or no tab").into()),
    };

    let entry = coordinator
        .screenshot_source
        .capture(&tab, &target)
        .await
        .context("screenshot collaborator failed")?;
    let screenshot_id = entry.id.clone();

    let mut activity = ActivityEntry::new(ActivityKind::Screenshot);
    activity.url = Some(entry.url.clone());
    activity.title = Some(entry.title.clone());
    let mut metadata = Map::new();
    metadata.insert("screenshotId".into(), Value::String(screenshot_id.clone()));
    activity.metadata = Some(metadata);

    coordinator.screenshots.register(entry);
    coordinator.activity.log(activity);

    Ok(Value::String(screenshot_id))
}

pub async fn tag_screenshot(coordinator: &Coordinator, payload: Value) -> Result<Value> {
    let request: TagPayload = serde_json::from_value(payload).context("invalid tag payload")?;
    let updated = coordinator
        .screenshots
        .add_tags(&request.screenshot_id, request.tags)
        .map_err(|_| Rejection("Screenshot not found"))?;
    Ok(serde_json::to_value(updated.tags)?)
}

pub async fn log_activity(coordinator: &Coordinator, payload: Value) -> Result<Value> {
    let entry: ActivityEntry =
        serde_json::from_value(payload).context("invalid activity entry")?;

    match coordinator.activity.log(entry) {
        LogOutcome::Recorded => Ok(Value::Null),
        LogOutcome::TrackingDisabled => Err(Rejection("Activity tracking disabled").into()),
    }
}

pub async fn send_email_report(coordinator: &Coordinator, _payload: Value) -> Result<Value> {
    let snapshot = coordinator.snapshot();
    let Some(address) = snapshot.settings.recipient_email().map(str::to_owned) else {
        return Err(Rejection("No report recipient configured").into());
    };

    let report = coordinator
        .reporter
        .generate_report(&snapshot)
        .await
        .context("report generation failed")?;
    let delivered = coordinator
        .reporter
        .send_report(&report, &address)
        .await
        .context("report delivery failed")?;

    if !delivered {
        return Err(Rejection("Failed to generate email report").into());
    }
    Ok(json!("Email report sent"))
}

pub async fn update_settings(coordinator: &Coordinator, payload: Value) -> Result<Value> {
    coordinator.settings.update(&payload)?;
    Ok(Value::Null)
}

pub async fn get_state(coordinator: &Coordinator, _payload: Value) -> Result<Value> {
    Ok(serde_json::to_value(coordinator.snapshot())?)
}

pub async fn generate_todo(coordinator: &Coordinator, payload: Value) -> Result<Value> {
    let request: TodoPayload = serde_json::from_value(payload).context("invalid todo payload")?;
    let content = request.content.trim();
    if content.is_empty() {
        return Err(Rejection("Nothing to turn into a todo").into());
    }

    let summary = coordinator.capability.summarize_text(content).await;
    let title = match summary.result {
        Some(title) if summary.success && !title.trim().is_empty() => title,
        _ if !summary.success => {
            anyhow::bail!("summarization failed: {:?}", summary.error)
        }
        _ => content.chars().take(TODO_TITLE_FALLBACK_CHARS).collect(),
    };

    let item = TodoItem {
        id: new_id(),
        title,
        source_url: request.context.url,
        source_title: request.context.title,
        completed: false,
        created_at: Utc::now(),
    };
    let id = item.id.clone();
    coordinator.todos.add(item);

    Ok(Value::String(id))
}

pub async fn capability_status(coordinator: &Coordinator, _payload: Value) -> Result<Value> {
    Ok(serde_json::to_value(coordinator.capability.status())?)
}
