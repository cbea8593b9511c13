use std::sync::{PoisonError, RwLock};

use anyhow::{anyhow, Result};

use crate::{
    models::ScreenshotEntry,
    persistence::{WriteBehind, SCREENSHOTS_KEY},
};

/// Index of captured screenshots. Entries are immutable apart from their tags.
pub struct ScreenshotStore {
    entries: RwLock<Vec<ScreenshotEntry>>,
    writer: WriteBehind,
}

impl ScreenshotStore {
    pub fn new(entries: Vec<ScreenshotEntry>, writer: WriteBehind) -> Self {
        Self {
            entries: RwLock::new(entries),
            writer,
        }
    }

    pub fn register(&self, entry: ScreenshotEntry) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.push(entry);
        self.writer.put(SCREENSHOTS_KEY, &*entries);
    }

    pub fn add_tags<I>(&self, screenshot_id: &str, tags: I) -> Result<ScreenshotEntry>
    where
        I: IntoIterator<Item = String>,
    {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = entries
            .iter_mut()
            .find(|entry| entry.id == screenshot_id)
            .ok_or_else(|| anyhow!("no screenshot with id {screenshot_id}"))?;
        entry.tags.extend(
            tags.into_iter()
                .map(|tag| tag.trim().to_string())
                .filter(|tag| !tag.is_empty()),
        );
        let updated = entry.clone();

        self.writer.put(SCREENSHOTS_KEY, &*entries);
        Ok(updated)
    }

    pub fn count(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Owned copy of the collection. Library API for embedders; no request
    /// type returns whole collections.
    pub fn list(&self) -> Vec<ScreenshotEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::persistence::MemoryStore;

    fn screenshot(id: &str) -> ScreenshotEntry {
        ScreenshotEntry {
            id: id.into(),
            data_url: "data:image/png;base64,AAAA".into(),
            timestamp: Utc::now(),
            url: "https://example.com".into(),
            title: "Example".into(),
            tags: Default::default(),
        }
    }

    #[tokio::test]
    async fn tags_are_deduplicated_and_persisted() {
        let backing = Arc::new(MemoryStore::new());
        let writer = WriteBehind::spawn(backing.clone());
        let store = ScreenshotStore::new(Vec::new(), writer.clone());

        store.register(screenshot("shot-1"));
        let tagged = store
            .add_tags("shot-1", vec!["docs".into(), " docs ".into(), "".into(), "rust".into()])
            .unwrap();

        assert_eq!(tagged.tags.len(), 2);
        writer.flush().await;
        let persisted = backing.value(SCREENSHOTS_KEY).await.unwrap();
        assert_eq!(persisted[0]["tags"], serde_json::json!(["docs", "rust"]));
    }

    #[tokio::test]
    async fn tagging_unknown_screenshot_fails() {
        let writer = WriteBehind::spawn(Arc::new(MemoryStore::new()));
        let store = ScreenshotStore::new(vec![screenshot("known")], writer);
        assert!(store.add_tags("missing", vec!["x".into()]).is_err());
        assert_eq!(store.count(), 1);
    }
}
