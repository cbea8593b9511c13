use std::{env, path::PathBuf, time::Duration};

use anyhow::{anyhow, Result};
use directories::ProjectDirs;
use log::warn;

pub const DEFAULT_ENGINE_MODEL: &str = "llama3.2:1b";
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

const DATABASE_FILE: &str = "tabpilot.db";
const OUTBOX_DIR: &str = "outbox";

#[derive(Debug, Clone, PartialEq)]
pub struct HostConfig {
    pub data_dir: PathBuf,
    /// `None` runs on the rule-based fallback only.
    pub engine_url: Option<String>,
    pub engine_model: String,
    pub load_timeout: Duration,
    pub debug: bool,
}

impl HostConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let data_dir = match non_empty("TABPILOT_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => ProjectDirs::from("dev", "tabpilot", "tabpilot")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .ok_or_else(|| anyhow!("no home directory; set TABPILOT_DATA_DIR"))?,
        };

        let load_timeout = match non_empty("TABPILOT_LOAD_TIMEOUT_SECS") {
            None => DEFAULT_LOAD_TIMEOUT,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) => Duration::from_secs(secs),
                Err(_) => {
                    warn!(
                        "Ignoring TABPILOT_LOAD_TIMEOUT_SECS={raw:?}; using {}s",
                        DEFAULT_LOAD_TIMEOUT.as_secs()
                    );
                    DEFAULT_LOAD_TIMEOUT
                }
            },
        };

        let debug = lookup("TABPILOT_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            data_dir,
            engine_url: non_empty("TABPILOT_ENGINE_URL")
                .map(|url| url.trim().trim_end_matches('/').to_string()),
            engine_model: non_empty("TABPILOT_ENGINE_MODEL")
                .unwrap_or_else(|| DEFAULT_ENGINE_MODEL.to_string()),
            load_timeout,
            debug,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    pub fn outbox_dir(&self) -> PathBuf {
        self.data_dir.join(OUTBOX_DIR)
    }
}
