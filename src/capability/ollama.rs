use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::engine::{Engine, EngineError, EnginePort, GenerationParams};

/// Port for a local Ollama server. Construction succeeds only if the server
/// answers and already has the configured model pulled.
pub struct OllamaPort {
    base_url: String,
    model: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: usize,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaPort {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client: Client::builder()
                .connect_timeout(Duration::from_secs(5))
                .pool_idle_timeout(Duration::from_secs(90))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn has_model(&self, tags: &TagsResponse) -> bool {
        tags.models.iter().any(|tag| {
            tag.name == self.model || tag.name.strip_suffix(":latest") == Some(self.model.as_str())
        })
    }
}

#[async_trait]
impl EnginePort for OllamaPort {
    fn name(&self) -> &str {
        &self.model
    }

    async fn construct(&self) -> Result<Arc<dyn Engine>, EngineError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| EngineError::Unavailable(format!("{url}: {err}")))?;

        if !response.status().is_success() {
            return Err(EngineError::Unavailable(format!(
                "{url} answered {}",
                response.status()
            )));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|err| EngineError::Incompatible(format!("unexpected tags payload: {err}")))?;

        if !self.has_model(&tags) {
            return Err(EngineError::Incompatible(format!(
                "model '{}' is not pulled on {}",
                self.model, self.base_url
            )));
        }

        Ok(Arc::new(OllamaEngine {
            endpoint: format!("{}/api/generate", self.base_url),
            model: self.model.clone(),
            client: self.client.clone(),
        }))
    }
}

pub struct OllamaEngine {
    endpoint: String,
    model: String,
    client: Client,
}

#[async_trait]
impl Engine for OllamaEngine {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, EngineError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                // Ollama has no sampling switch; greedy decoding is temperature 0.
                temperature: if params.do_sample { params.temperature } else { 0.0 },
                num_predict: params.max_new_tokens,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|err| EngineError::Generation(err.to_string()))?;

        if !response.status().is_success() {
            return Err(EngineError::Generation(format!(
                "{} answered {}",
                self.endpoint,
                response.status()
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|err| EngineError::Generation(err.to_string()))?;
        Ok(body.response)
    }
}
