use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;

use super::{
    engine::{Engine, EngineError, EnginePort, GenerationParams},
    fallback,
    state::{CapabilityState, CapabilityStatus, EngineKind, FALLBACK_ENGINE_NAME},
};
use crate::{log_error, log_info, log_warn};

const ENABLE_LOGS: bool = true;
const SUMMARY_INPUT_CHARS: usize = 500;

#[derive(Clone)]
pub enum EngineHandle {
    Primary(Arc<dyn Engine>),
    Fallback,
}

impl EngineHandle {
    pub fn kind(&self) -> EngineKind {
        match self {
            EngineHandle::Primary(_) => EngineKind::Primary,
            EngineHandle::Fallback => EngineKind::Fallback,
        }
    }
}

type PendingLoad = Shared<BoxFuture<'static, EngineHandle>>;

enum Lifecycle {
    Uninitialized,
    /// The single in-flight load; every concurrent initializer awaits a clone.
    Loading(PendingLoad),
    Ready(EngineHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CorrectGrammar,
    Summarize,
    Improve,
}

impl Operation {
    /// Unrecognized labels fall through to grammar correction.
    pub fn from_action(action: &str) -> Self {
        match action {
            "summarize" => Operation::Summarize,
            "improve" => Operation::Improve,
            _ => Operation::CorrectGrammar,
        }
    }

    fn prompt(self, text: &str) -> String {
        match self {
            Operation::CorrectGrammar => format!(
                "Correct the grammar and improve the clarity of this text while keeping the same meaning:\n\n\"{text}\"\n\nCorrected text:"
            ),
            Operation::Summarize => {
                let excerpt: String = text.chars().take(SUMMARY_INPUT_CHARS).collect();
                format!("Summarize this text in 2-3 sentences:\n\n\"{excerpt}\"\n\nSummary:")
            }
            Operation::Improve => format!(
                "Improve this text to make it more professional and clear:\n\n\"{text}\"\n\nImproved text:"
            ),
        }
    }

    fn params(self, text: &str) -> GenerationParams {
        let len = text.chars().count();
        let (max_new_tokens, temperature) = match self {
            Operation::CorrectGrammar => (len.saturating_mul(2).min(100), 0.3),
            Operation::Summarize => (100, 0.5),
            Operation::Improve => ((len.saturating_mul(3) / 2).min(150), 0.4),
        };
        GenerationParams {
            max_new_tokens,
            temperature,
            do_sample: true,
        }
    }

    fn output_limit(self) -> usize {
        match self {
            Operation::CorrectGrammar | Operation::Summarize => 200,
            Operation::Improve => 300,
        }
    }

    fn fallback(self, text: &str) -> String {
        match self {
            Operation::CorrectGrammar => fallback::correct_grammar(text),
            Operation::Summarize => fallback::summarize(text),
            Operation::Improve => fallback::improve(text),
        }
    }

    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::CorrectGrammar => "Failed to correct grammar",
            Operation::Summarize => "Failed to summarize text",
            Operation::Improve => "Failed to improve text",
        }
    }
}

/// Outcome envelope of one enhancement call; timing is always populated.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub processing_time_ms: f64,
}

/// Owns the text engine for the lifetime of the process. Construction
/// failures never reach callers: the manager settles on the rule-based
/// fallback instead. There is no teardown.
pub struct CapabilityManager {
    port: Arc<dyn EnginePort>,
    lifecycle: Arc<Mutex<Lifecycle>>,
    load_timeout: Option<Duration>,
}

impl CapabilityManager {
    pub fn new(port: Arc<dyn EnginePort>) -> Self {
        Self {
            port,
            lifecycle: Arc::new(Mutex::new(Lifecycle::Uninitialized)),
            load_timeout: None,
        }
    }

    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = Some(timeout);
        self
    }

    pub fn state(&self) -> CapabilityState {
        match &*lock(&self.lifecycle) {
            Lifecycle::Uninitialized => CapabilityState::Uninitialized,
            Lifecycle::Loading(_) => CapabilityState::Loading,
            Lifecycle::Ready(handle) => CapabilityState::Ready(handle.kind()),
        }
    }

    pub fn status(&self) -> CapabilityStatus {
        let state = self.state();
        let engine = match state {
            CapabilityState::Ready(EngineKind::Fallback) => FALLBACK_ENGINE_NAME.to_string(),
            _ => self.port.name().to_string(),
        };
        CapabilityStatus {
            loaded: state.is_ready(),
            loading: state == CapabilityState::Loading,
            engine,
            kind: state.engine_kind(),
        }
    }

    /// Idempotent. Concurrent callers share one load; all of them observe the
    /// same terminal `Ready` state.
    pub async fn initialize(&self) -> CapabilityState {
        CapabilityState::Ready(self.engine().await.kind())
    }

    async fn engine(&self) -> EngineHandle {
        // The transition to `Loading` happens under the lock, before the first
        // suspension point.
        let pending = {
            let mut lifecycle = lock(&self.lifecycle);
            match &*lifecycle {
                Lifecycle::Ready(handle) => return handle.clone(),
                Lifecycle::Loading(pending) => pending.clone(),
                Lifecycle::Uninitialized => {
                    log_info!("Loading text engine '{}'", self.port.name());
                    let pending = self.load().boxed().shared();
                    *lifecycle = Lifecycle::Loading(pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    fn load(&self) -> impl std::future::Future<Output = EngineHandle> + Send + 'static {
        let port = self.port.clone();
        let lifecycle = self.lifecycle.clone();
        let load_timeout = self.load_timeout;

        async move {
            let constructed = match load_timeout {
                Some(limit) => tokio::time::timeout(limit, port.construct())
                    .await
                    .unwrap_or_else(|_| Err(EngineError::Timeout(limit))),
                None => port.construct().await,
            };

            let handle = match constructed {
                Ok(engine) => {
                    log_info!("Text engine '{}' ready", port.name());
                    EngineHandle::Primary(engine)
                }
                Err(err) => {
                    log_warn!("Falling back to rule-based processing: {err}");
                    EngineHandle::Fallback
                }
            };

            *lock(&lifecycle) = Lifecycle::Ready(handle.clone());
            handle
        }
    }

    pub async fn correct_grammar(&self, text: &str) -> EnhancementResult {
        self.run(Operation::CorrectGrammar, text).await
    }

    pub async fn summarize_text(&self, text: &str) -> EnhancementResult {
        self.run(Operation::Summarize, text).await
    }

    pub async fn improve_text(&self, text: &str) -> EnhancementResult {
        self.run(Operation::Improve, text).await
    }

    pub async fn enhance(&self, text: &str, action: &str) -> EnhancementResult {
        self.run(Operation::from_action(action), text).await
    }

    async fn run(&self, operation: Operation, text: &str) -> EnhancementResult {
        let started = Instant::now();

        let outcome = match self.engine().await {
            EngineHandle::Fallback => Ok(operation.fallback(text)),
            EngineHandle::Primary(engine) => {
                let prompt = operation.prompt(text);
                engine
                    .generate(&prompt, &operation.params(text))
                    .await
                    .map(|raw| extract_response(&raw, &prompt, operation.output_limit()))
            }
        };

        let processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        match outcome {
            Ok(result) => EnhancementResult {
                success: true,
                result: Some(result),
                error: None,
                processing_time_ms,
            },
            Err(err) => {
                log_error!("{:?} failed: {err}", operation);
                EnhancementResult {
                    success: false,
                    result: None,
                    error: Some(operation.failure_message().to_string()),
                    processing_time_ms,
                }
            }
        }
    }
}

fn lock(lifecycle: &Mutex<Lifecycle>) -> MutexGuard<'_, Lifecycle> {
    lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
}

/// First non-empty line after the echoed prompt, capped at `limit` chars.
fn extract_response(raw: &str, prompt: &str, limit: usize) -> String {
    let continuation = raw.strip_prefix(prompt).unwrap_or(raw).trim();
    continuation
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.chars().take(limit).collect())
        .unwrap_or_default()
}
