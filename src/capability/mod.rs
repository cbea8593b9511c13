pub mod engine;
pub mod fallback;
pub mod manager;
pub mod ollama;
pub mod state;

pub use engine::{Engine, EngineError, EnginePort, GenerationParams, NoEngine};
pub use manager::{CapabilityManager, EnhancementResult, Operation};
pub use ollama::OllamaPort;
pub use state::{CapabilityState, CapabilityStatus, EngineDescriptor, EngineKind};
