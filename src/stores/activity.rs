use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use log::debug;

use crate::{
    models::ActivityEntry,
    persistence::{WriteBehind, ACTIVITY_LOGS_KEY},
    settings::SettingsStore,
};

const MS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutcome {
    Recorded,
    TrackingDisabled,
}

/// Append-only event log bounded by the privacy retention window.
pub struct ActivityStore {
    entries: RwLock<Vec<ActivityEntry>>,
    settings: Arc<SettingsStore>,
    writer: WriteBehind,
}

impl ActivityStore {
    pub fn new(
        entries: Vec<ActivityEntry>,
        settings: Arc<SettingsStore>,
        writer: WriteBehind,
    ) -> Self {
        Self {
            entries: RwLock::new(entries),
            settings,
            writer,
        }
    }

    /// Append `entry`, then drop everything older than the retention window as
    /// configured right now. Pruning only happens here.
    pub fn log(&self, entry: ActivityEntry) -> LogOutcome {
        let settings = self.settings.current();
        if !settings.activity_tracking {
            return LogOutcome::TrackingDisabled;
        }

        let cutoff = retention_cutoff(Utc::now(), settings.retention_days());
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.push(entry);
        let before = entries.len();
        entries.retain(|existing| existing.timestamp >= cutoff);
        let pruned = before - entries.len();
        if pruned > 0 {
            debug!("Pruned {pruned} activity entries older than {cutoff}");
        }

        // Queued under the guard so writes reach the store in mutation order.
        self.writer.put(ACTIVITY_LOGS_KEY, &*entries);
        LogOutcome::Recorded
    }

    pub fn count(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Owned copy of the collection. Library API for embedders; no request
    /// type returns whole collections.
    pub fn list(&self) -> Vec<ActivityEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Zero or negative retention keeps only entries stamped at or after `now`.
fn retention_cutoff(now: DateTime<Utc>, retention_days: i64) -> DateTime<Utc> {
    let window_ms = retention_days.max(0).saturating_mul(MS_PER_DAY);
    now.checked_sub_signed(Duration::milliseconds(window_ms))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
