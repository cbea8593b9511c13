use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reported event kind. The set is open: labels this build does not know are
/// kept verbatim so stored entries round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityKind {
    Navigation,
    Screenshot,
    TextInput,
    Other(String),
}

impl ActivityKind {
    pub fn as_str(&self) -> &str {
        match self {
            ActivityKind::Navigation => "navigation",
            ActivityKind::Screenshot => "screenshot",
            ActivityKind::TextInput => "text_input",
            ActivityKind::Other(label) => label,
        }
    }
}

impl From<String> for ActivityKind {
    fn from(label: String) -> Self {
        match label.as_str() {
            "navigation" => ActivityKind::Navigation,
            "screenshot" => ActivityKind::Screenshot,
            "text_input" => ActivityKind::TextInput,
            _ => ActivityKind::Other(label),
        }
    }
}

impl From<ActivityKind> for String {
    fn from(kind: ActivityKind) -> Self {
        match kind {
            ActivityKind::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

/// One reported event. Wire timestamps are epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    #[serde(default = "super::new_id")]
    pub id: String,
    #[serde(default = "Utc::now", with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl ActivityEntry {
    pub fn new(kind: ActivityKind) -> Self {
        Self {
            id: super::new_id(),
            timestamp: Utc::now(),
            kind,
            url: None,
            title: None,
            metadata: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_reporter_payload() {
        let entry: ActivityEntry = serde_json::from_value(json!({
            "id": "lx1",
            "timestamp": 1_700_000_000_000i64,
            "type": "text_input",
            "url": "https://example.com",
            "title": "Example",
            "metadata": { "elementType": "textarea" }
        }))
        .unwrap();

        assert_eq!(entry.kind, ActivityKind::TextInput);
        assert_eq!(entry.timestamp.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(entry.metadata.unwrap()["elementType"], "textarea");
    }

    #[test]
    fn missing_id_and_timestamp_are_filled_in() {
        let before = Utc::now();
        let entry: ActivityEntry =
            serde_json::from_value(json!({ "type": "navigation" })).unwrap();

        assert!(!entry.id.is_empty());
        assert!(entry.timestamp >= before - chrono::Duration::seconds(1));
    }

    #[test]
    fn unknown_kinds_keep_their_label() {
        let entry: ActivityEntry =
            serde_json::from_value(json!({ "id": "a1", "type": "tab_switch" })).unwrap();
        assert_eq!(entry.kind, ActivityKind::Other("tab_switch".into()));

        let stored = serde_json::to_value(&entry).unwrap();
        assert_eq!(stored["type"], "tab_switch");

        let reloaded: ActivityEntry = serde_json::from_value(stored).unwrap();
        assert_eq!(reloaded, entry);
    }

    #[test]
    fn known_kinds_use_snake_case_labels() {
        assert_eq!(
            serde_json::to_value(ActivityKind::TextInput).unwrap(),
            json!("text_input")
        );
        assert_eq!(ActivityKind::from("screenshot".to_string()), ActivityKind::Screenshot);
    }
}
