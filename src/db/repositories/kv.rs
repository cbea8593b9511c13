use anyhow::{Context, Result};
use chrono::Utc;
use log::warn;
use rusqlite::{params, OptionalExtension};
use serde_json::{Map, Value};

use crate::db::Database;

impl Database {
    /// Read the JSON documents stored under `keys`. Absent keys are left out of
    /// the result; a document that no longer parses is logged and skipped.
    pub async fn get_values(&self, keys: Vec<String>) -> Result<Map<String, Value>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
            let mut values = Map::new();

            for key in keys {
                let raw: Option<String> = stmt
                    .query_row(params![key], |row| row.get(0))
                    .optional()
                    .with_context(|| format!("failed to read key '{key}'"))?;

                let Some(raw) = raw else { continue };
                match serde_json::from_str::<Value>(&raw) {
                    Ok(value) => {
                        values.insert(key, value);
                    }
                    Err(err) => warn!("Ignoring corrupt value stored under '{key}': {err}"),
                }
            }

            Ok(values)
        })
        .await
    }

    /// Upsert every entry in a single transaction.
    pub async fn put_values(&self, entries: Map<String, Value>) -> Result<()> {
        self.execute(move |conn| {
            let now = Utc::now().to_rfc3339();
            let tx = conn
                .transaction()
                .context("failed to open kv transaction")?;

            for (key, value) in entries {
                let serialized = serde_json::to_string(&value)?;
                tx.execute(
                    "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                    params![key, serialized, now],
                )
                .with_context(|| format!("failed to write key '{key}'"))?;
            }

            tx.commit().context("failed to commit kv transaction")?;
            Ok(())
        })
        .await
    }
}
