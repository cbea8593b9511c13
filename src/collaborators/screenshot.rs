use std::collections::BTreeSet;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::models::{new_id, ScreenshotEntry};

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub window_id: Option<i64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Surface to capture, as described by the requesting UI.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaptureTarget {
    #[serde(default)]
    pub tab: Option<TabInfo>,
    #[serde(default)]
    pub data_url: Option<String>,
}

#[async_trait]
pub trait ScreenshotCollaborator: Send + Sync {
    async fn capture(&self, tab: &TabInfo, target: &CaptureTarget) -> Result<ScreenshotEntry>;
}

/// The browser does the pixel capture and forwards the encoded image; this
/// side only validates it and stamps the entry.
pub struct ForwardedCapture;

#[async_trait]
impl ScreenshotCollaborator for ForwardedCapture {
    async fn capture(&self, tab: &TabInfo, target: &CaptureTarget) -> Result<ScreenshotEntry> {
        let Some(data_url) = target.data_url.as_deref() else {
            bail!("no image data forwarded for tab {:?}", tab.id);
        };
        if !data_url.starts_with("data:image/") {
            bail!("forwarded capture is not an image data URL");
        }

        Ok(ScreenshotEntry {
            id: new_id(),
            data_url: data_url.to_string(),
            timestamp: Utc::now(),
            url: tab.url.clone().unwrap_or_default(),
            title: tab.title.clone().unwrap_or_else(|| "Unknown Page".into()),
            tags: BTreeSet::new(),
        })
    }
}
