//! Process-scoped coordinator state.
//!
//! Built once at start-up from the persistent store and alive until the
//! process exits; nothing tears it down. Every mutation is queued for
//! write-behind persistence.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::{
    capability::{CapabilityManager, EngineDescriptor},
    collaborators::{ReportCollaborator, ScreenshotCollaborator},
    persistence::{
        decode_list, PersistentStore, WriteBehind, ACTIVITY_LOGS_KEY, ALL_KEYS, SCREENSHOTS_KEY,
        SETTINGS_KEY, STATE_KEY, TODOS_KEY,
    },
    settings::{Settings, SettingsStore},
    stores::{ActivityStore, ScreenshotStore, TodoStore},
};

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeState {
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default = "Utc::now", with = "chrono::serde::ts_milliseconds")]
    pub last_activity: DateTime<Utc>,
    #[serde(default)]
    pub total_interactions: u64,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            is_active: true,
            last_activity: Utc::now(),
            total_interactions: 0,
        }
    }
}

/// Owned, point-in-time copy of everything the UI polls for.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub is_active: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_activity: DateTime<Utc>,
    pub total_interactions: u64,
    pub settings: Settings,
    pub current_model: EngineDescriptor,
    pub activity_count: usize,
    pub screenshot_count: usize,
    pub todo_count: usize,
}

/// External pieces the coordinator drives but does not own the logic of.
pub struct Collaborators {
    pub capability: Arc<CapabilityManager>,
    pub screenshot_source: Arc<dyn ScreenshotCollaborator>,
    pub reporter: Arc<dyn ReportCollaborator>,
}

pub struct Coordinator {
    pub settings: Arc<SettingsStore>,
    pub activity: ActivityStore,
    pub screenshots: ScreenshotStore,
    pub todos: TodoStore,
    pub capability: Arc<CapabilityManager>,
    pub screenshot_source: Arc<dyn ScreenshotCollaborator>,
    pub reporter: Arc<dyn ReportCollaborator>,
    runtime: Mutex<RuntimeState>,
    writer: WriteBehind,
}

impl Coordinator {
    /// Load every persisted key and build the stores. A failed read is logged
    /// and the coordinator starts from defaults.
    pub async fn hydrate(
        store: Arc<dyn PersistentStore>,
        writer: WriteBehind,
        collaborators: Collaborators,
    ) -> Self {
        let values = store.get(&ALL_KEYS).await.unwrap_or_else(|err| {
            error!("Failed to load stored data, starting fresh: {err:#}");
            Map::new()
        });

        let settings = Arc::new(SettingsStore::new(values.get(SETTINGS_KEY), writer.clone()));
        let activity = ActivityStore::new(
            decode_list(&values, ACTIVITY_LOGS_KEY),
            settings.clone(),
            writer.clone(),
        );
        let screenshots = ScreenshotStore::new(decode_list(&values, SCREENSHOTS_KEY), writer.clone());
        let todos = TodoStore::new(decode_list(&values, TODOS_KEY), writer.clone());

        let runtime = match values.get(STATE_KEY) {
            Some(stored) => serde_json::from_value(stored.clone()).unwrap_or_else(|err| {
                error!("Discarding unreadable runtime state: {err}");
                RuntimeState::default()
            }),
            None => RuntimeState::default(),
        };

        info!(
            "Hydrated {} activities, {} screenshots, {} todos ({} prior interactions)",
            activity.count(),
            screenshots.count(),
            todos.count(),
            runtime.total_interactions
        );

        Self {
            settings,
            activity,
            screenshots,
            todos,
            capability: collaborators.capability,
            screenshot_source: collaborators.screenshot_source,
            reporter: collaborators.reporter,
            runtime: Mutex::new(runtime),
            writer,
        }
    }

    /// Per-request bookkeeping, done before any handler runs.
    pub fn record_interaction(&self) {
        let mut runtime = self.runtime.lock().unwrap_or_else(PoisonError::into_inner);
        runtime.last_activity = Utc::now();
        runtime.total_interactions = runtime.total_interactions.saturating_add(1);
        self.writer.put(STATE_KEY, &*runtime);
    }

    pub fn runtime_state(&self) -> RuntimeState {
        self.runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let runtime = self.runtime_state();
        StateSnapshot {
            is_active: runtime.is_active,
            last_activity: runtime.last_activity,
            total_interactions: runtime.total_interactions,
            settings: self.settings.current(),
            current_model: self.capability.status().into(),
            activity_count: self.activity.count(),
            screenshot_count: self.screenshots.count(),
            todo_count: self.todos.count(),
        }
    }

    /// Wait for queued persistence writes. Only needed for an orderly exit.
    pub async fn flush(&self) {
        self.writer.flush().await;
    }
}
