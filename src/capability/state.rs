use serde::{Deserialize, Serialize};

pub const FALLBACK_ENGINE_NAME: &str = "Rule-based";

pub const CAPABILITIES: [&str; 3] = ["text-generation", "summarization", "grammar-correction"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EngineKind {
    Primary,
    Fallback,
}

/// Lifecycle of the text engine. Only moves forward:
/// `Uninitialized -> Loading -> Ready(_)`, and never leaves `Ready`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "state", content = "engine")]
pub enum CapabilityState {
    #[default]
    Uninitialized,
    Loading,
    Ready(EngineKind),
}

impl CapabilityState {
    pub fn is_ready(&self) -> bool {
        matches!(self, CapabilityState::Ready(_))
    }

    pub fn engine_kind(&self) -> Option<EngineKind> {
        match self {
            CapabilityState::Ready(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// Read-only view for UI polling.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityStatus {
    pub loaded: bool,
    pub loading: bool,
    pub engine: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<EngineKind>,
}

/// `currentModel` block of the state snapshot.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EngineDescriptor {
    pub name: String,
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<EngineKind>,
    pub capabilities: Vec<String>,
}

impl From<CapabilityStatus> for EngineDescriptor {
    fn from(status: CapabilityStatus) -> Self {
        Self {
            name: status.engine,
            loaded: status.loaded,
            kind: status.kind,
            capabilities: CAPABILITIES.iter().map(|cap| cap.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_starts_uninitialized() {
        let state = CapabilityState::default();
        assert_eq!(state, CapabilityState::Uninitialized);
        assert!(!state.is_ready());
        assert_eq!(state.engine_kind(), None);
    }
}
