//! Durable key/value boundary shared by every store.
//!
//! Stores never await their own writes: each mutation is handed to
//! [`WriteBehind`], which applies writes in the order they were queued on a
//! single background task. Anything still queued when the process dies is lost.

use std::{collections::HashMap, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, error};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::db::Database;

pub const SETTINGS_KEY: &str = "settings";
pub const ACTIVITY_LOGS_KEY: &str = "activityLogs";
pub const SCREENSHOTS_KEY: &str = "screenshots";
pub const TODOS_KEY: &str = "todos";
pub const STATE_KEY: &str = "state";

pub const ALL_KEYS: [&str; 5] = [
    SETTINGS_KEY,
    ACTIVITY_LOGS_KEY,
    SCREENSHOTS_KEY,
    TODOS_KEY,
    STATE_KEY,
];

#[async_trait]
pub trait PersistentStore: Send + Sync {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>>;
    async fn set(&self, entries: Map<String, Value>) -> Result<()>;
}

#[async_trait]
impl PersistentStore for Database {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>> {
        self.get_values(keys.iter().map(|key| key.to_string()).collect())
            .await
    }

    async fn set(&self, entries: Map<String, Value>) -> Result<()> {
        self.put_values(entries).await
    }
}

/// Volatile backend, also what the tests persist into.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn value(&self, key: &str) -> Option<Value> {
        self.values.lock().await.get(key).cloned()
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>> {
        let values = self.values.lock().await;
        Ok(keys
            .iter()
            .filter_map(|key| {
                values
                    .get(*key)
                    .map(|value| (key.to_string(), value.clone()))
            })
            .collect())
    }

    async fn set(&self, entries: Map<String, Value>) -> Result<()> {
        let mut values = self.values.lock().await;
        values.extend(entries);
        Ok(())
    }
}

enum WriteCommand {
    Put(String, Value),
    Flush(oneshot::Sender<()>),
}

/// Ordered fire-and-forget writer in front of a [`PersistentStore`].
#[derive(Clone)]
pub struct WriteBehind {
    sender: mpsc::UnboundedSender<WriteCommand>,
}

impl WriteBehind {
    /// Spawns the writer task; must be called inside a tokio runtime.
    pub fn spawn(store: Arc<dyn PersistentStore>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<WriteCommand>();

        tokio::spawn(async move {
            while let Some(command) = receiver.recv().await {
                match command {
                    WriteCommand::Put(key, value) => {
                        let mut entries = Map::new();
                        entries.insert(key.clone(), value);
                        match store.set(entries).await {
                            Ok(()) => debug!("Persisted '{key}'"),
                            Err(err) => error!("Failed to persist '{key}': {err:#}"),
                        }
                    }
                    WriteCommand::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
        });

        Self { sender }
    }

    /// Queue `value` for `key`. Serialization or queueing failures are logged,
    /// never returned.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(err) => {
                error!("Failed to serialize '{key}' for persistence: {err}");
                return;
            }
        };

        if self
            .sender
            .send(WriteCommand::Put(key.to_string(), value))
            .is_err()
        {
            error!("Persistence writer is gone; dropping write for '{key}'");
        }
    }

    /// Resolves once every write queued before this call has been attempted.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.sender.send(WriteCommand::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }
}

/// Decode a persisted list, treating an absent or malformed document as empty.
pub fn decode_list<T: serde::de::DeserializeOwned>(
    values: &Map<String, Value>,
    key: &str,
) -> Vec<T> {
    match values.get(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|err| {
            error!("Discarding unreadable '{key}' collection: {err}");
            Vec::new()
        }),
    }
}
