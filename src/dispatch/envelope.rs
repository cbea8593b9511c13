use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capability::EnhancementResult;

/// Inbound request as the extension sends it.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Request {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Opaque correlation token, echoed back untouched.
    #[serde(default)]
    pub id: Option<Value>,
}

impl Request {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
            timestamp: Some(Utc::now()),
            id: None,
        }
    }
}

/// The one shape every reply takes, success or not.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl Response {
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            result: (!result.is_null()).then_some(result),
            error: None,
            processing_time_ms: None,
            id: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(message.into()),
            processing_time_ms: None,
            id: None,
        }
    }

    pub fn with_id(mut self, id: Option<Value>) -> Self {
        self.id = id;
        self
    }
}

impl From<EnhancementResult> for Response {
    fn from(outcome: EnhancementResult) -> Self {
        Self {
            success: outcome.success,
            result: outcome.result.map(Value::String),
            error: outcome.error,
            processing_time_ms: Some(outcome.processing_time_ms),
            id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    ProcessText,
    Summarize,
    CorrectGrammar,
    CaptureScreenshot,
    TagScreenshot,
    LogActivity,
    SendEmailReport,
    UpdateSettings,
    GetState,
    GenerateTodo,
    GetCapabilityStatus,
}

impl OperationType {
    pub fn from_wire(kind: &str) -> Option<Self> {
        let operation = match kind {
            "PROCESS_TEXT" | "AI_PROCESS_TEXT" => OperationType::ProcessText,
            "SUMMARIZE" | "AI_SUMMARIZE" => OperationType::Summarize,
            "CORRECT_GRAMMAR" | "AI_CORRECT_GRAMMAR" => OperationType::CorrectGrammar,
            "CAPTURE_SCREENSHOT" => OperationType::CaptureScreenshot,
            "TAG_SCREENSHOT" => OperationType::TagScreenshot,
            "LOG_ACTIVITY" => OperationType::LogActivity,
            "SEND_EMAIL_REPORT" => OperationType::SendEmailReport,
            "UPDATE_SETTINGS" => OperationType::UpdateSettings,
            "GET_STATE" => OperationType::GetState,
            "GENERATE_TODO" => OperationType::GenerateTodo,
            "GET_CAPABILITY_STATUS" => OperationType::GetCapabilityStatus,
            _ => return None,
        };
        Some(operation)
    }

    /// Generic user-facing message for an unexpected failure.
    pub fn failure_message(self) -> &'static str {
        match self {
            OperationType::ProcessText => "Failed to process text",
            OperationType::Summarize => "Failed to summarize text",
            OperationType::CorrectGrammar => "Failed to correct grammar",
            OperationType::CaptureScreenshot => "Failed to capture screenshot",
            OperationType::TagScreenshot => "Failed to tag screenshot",
            OperationType::LogActivity => "Failed to log activity",
            OperationType::SendEmailReport => "Failed to send email report",
            OperationType::UpdateSettings => "Failed to update settings",
            OperationType::GetState => "Failed to read state",
            OperationType::GenerateTodo => "Failed to generate todo",
            OperationType::GetCapabilityStatus => "Failed to read capability status",
        }
    }
}
