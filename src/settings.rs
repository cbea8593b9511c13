use std::sync::{PoisonError, RwLock};

use anyhow::{bail, Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::persistence::{WriteBehind, SETTINGS_KEY};

pub const DEFAULT_RETENTION_DAYS: i64 = 30;

// Nested blocks hold only the sub-fields that were actually supplied. A
// top-level update replaces the whole block, so omitted sub-fields read back
// as absent rather than silently keeping their old values.

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmailReportSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_screenshots: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_activity_log: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_todos: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_websites: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HotkeySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toggle_assistant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_summarize: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grammar_check: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrivacySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_retention_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_analytics: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub ai_enabled: bool,
    pub auto_correction: bool,
    pub screenshot_capture: bool,
    pub activity_tracking: bool,
    pub email_reports: EmailReportSettings,
    pub hotkeys: HotkeySettings,
    pub privacy: PrivacySettings,
    /// Top-level keys this build does not model; kept so they round-trip.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ai_enabled: true,
            auto_correction: false,
            screenshot_capture: true,
            activity_tracking: true,
            email_reports: EmailReportSettings {
                enabled: Some(false),
                frequency: Some("weekly".into()),
                include_screenshots: Some(true),
                include_activity_log: Some(true),
                include_todos: Some(true),
                include_websites: Some(true),
                recipient_email: None,
            },
            hotkeys: HotkeySettings {
                toggle_assistant: Some("Ctrl+Shift+A".into()),
                quick_summarize: Some("Ctrl+Shift+S".into()),
                grammar_check: Some("Ctrl+Shift+G".into()),
            },
            privacy: PrivacySettings {
                data_retention_days: Some(DEFAULT_RETENTION_DAYS),
                share_analytics: Some(false),
            },
            extra: Map::new(),
        }
    }
}

impl Settings {
    /// Retention used for pruning; an erased sub-field falls back to the default.
    pub fn retention_days(&self) -> i64 {
        self.privacy
            .data_retention_days
            .unwrap_or(DEFAULT_RETENTION_DAYS)
    }

    pub fn recipient_email(&self) -> Option<&str> {
        self.email_reports
            .recipient_email
            .as_deref()
            .filter(|address| !address.trim().is_empty())
    }

    /// Single-level merge: every top-level key in `partial` replaces the
    /// stored key wholesale. Nested blocks are not merged.
    pub fn merged_with(&self, partial: &Value) -> Result<Settings> {
        let Value::Object(partial) = partial else {
            bail!("settings update must be a JSON object");
        };

        let mut merged = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => bail!("settings did not serialize to an object"),
        };
        for (key, value) in partial {
            merged.insert(key.clone(), value.clone());
        }

        serde_json::from_value(Value::Object(merged)).context("invalid settings update")
    }
}

pub struct SettingsStore {
    data: RwLock<Settings>,
    writer: WriteBehind,
}

impl SettingsStore {
    /// Hydrate from the persisted document, laid over defaults with the same
    /// top-level replacement rule as [`SettingsStore::update`].
    pub fn new(persisted: Option<&Value>, writer: WriteBehind) -> Self {
        let defaults = Settings::default();
        let data = match persisted {
            None | Some(Value::Null) => defaults,
            Some(stored) => defaults.merged_with(stored).unwrap_or_else(|err| {
                warn!("Stored settings unreadable, using defaults: {err:#}");
                Settings::default()
            }),
        };

        Self {
            data: RwLock::new(data),
            writer,
        }
    }

    pub fn current(&self) -> Settings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update(&self, partial: &Value) -> Result<Settings> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        let merged = guard.merged_with(partial)?;
        *guard = merged.clone();
        self.writer.put(SETTINGS_KEY, &merged);
        drop(guard);

        info!("Settings updated");
        Ok(merged)
    }
}
