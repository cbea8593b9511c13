use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Why a primary engine could not be brought up.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine unavailable: {0}")]
    Unavailable(String),
    #[error("engine construction timed out after {0:?}")]
    Timeout(Duration),
    #[error("engine incompatible with this environment: {0}")]
    Incompatible(String),
    #[error("generation failed: {0}")]
    Generation(String),
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    pub max_new_tokens: usize,
    pub temperature: f32,
    pub do_sample: bool,
}

/// A constructed text generator. Output may echo the prompt.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, EngineError>;
}

/// Factory for the primary engine.
#[async_trait]
pub trait EnginePort: Send + Sync {
    /// Name reported while this port's engine is (or would be) in use.
    fn name(&self) -> &str;

    async fn construct(&self) -> Result<Arc<dyn Engine>, EngineError>;
}

/// Port with no primary engine at all; every load degrades to rule-based.
pub struct NoEngine;

#[async_trait]
impl EnginePort for NoEngine {
    fn name(&self) -> &str {
        "none"
    }

    async fn construct(&self) -> Result<Arc<dyn Engine>, EngineError> {
        Err(EngineError::Unavailable("no engine configured".into()))
    }
}
