//! Request routing: one fixed table from wire type to handler, and one
//! envelope shape back. Handlers never panic past this point; every failure
//! becomes `{ success: false, error }`.

pub mod commands;
pub mod envelope;

use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;

pub use commands::Rejection;
pub use envelope::{OperationType, Request, Response};

use crate::{capability::EnhancementResult, runtime::Coordinator};
use crate::{log_debug, log_error, log_warn};

const ENABLE_LOGS: bool = true;

pub const UNKNOWN_MESSAGE_TYPE: &str = "Unknown message type";

#[derive(Clone)]
pub struct Dispatcher {
    coordinator: Arc<Coordinator>,
}

impl Dispatcher {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    pub async fn dispatch(&self, request: Request) -> Response {
        // Counted before routing, so unknown and failing requests count too.
        self.coordinator.record_interaction();

        let Request {
            kind, payload, id, ..
        } = request;

        let Some(operation) = OperationType::from_wire(&kind) else {
            log_warn!("Unknown message type '{kind}'");
            return Response::failure(UNKNOWN_MESSAGE_TYPE).with_id(id);
        };
        log_debug!("Dispatching {operation:?}");

        let coordinator = self.coordinator.as_ref();
        let response = match operation {
            OperationType::ProcessText => {
                enhancement(operation, commands::process_text(coordinator, payload).await)
            }
            OperationType::Summarize => {
                enhancement(operation, commands::summarize(coordinator, payload).await)
            }
            OperationType::CorrectGrammar => {
                enhancement(operation, commands::correct_grammar(coordinator, payload).await)
            }
            OperationType::CaptureScreenshot => envelope(
                operation,
                commands::capture_screenshot(coordinator, payload).await,
            ),
            OperationType::TagScreenshot => {
                envelope(operation, commands::tag_screenshot(coordinator, payload).await)
            }
            OperationType::LogActivity => {
                envelope(operation, commands::log_activity(coordinator, payload).await)
            }
            OperationType::SendEmailReport => envelope(
                operation,
                commands::send_email_report(coordinator, payload).await,
            ),
            OperationType::UpdateSettings => {
                envelope(operation, commands::update_settings(coordinator, payload).await)
            }
            OperationType::GetState => {
                envelope(operation, commands::get_state(coordinator, payload).await)
            }
            OperationType::GenerateTodo => {
                envelope(operation, commands::generate_todo(coordinator, payload).await)
            }
            OperationType::GetCapabilityStatus => envelope(
                operation,
                commands::capability_status(coordinator, payload).await,
            ),
        };

        response.with_id(id)
    }
}

fn envelope(operation: OperationType, outcome: Result<Value>) -> Response {
    match outcome {
        Ok(result) => Response::ok(result),
        Err(err) => failure(operation, err),
    }
}

fn enhancement(operation: OperationType, outcome: Result<EnhancementResult>) -> Response {
    match outcome {
        Ok(result) => result.into(),
        Err(err) => failure(operation, err),
    }
}

fn failure(operation: OperationType, err: anyhow::Error) -> Response {
    if let Some(rejection) = err.downcast_ref::<Rejection>() {
        log_debug!("{operation:?} rejected: {rejection}");
        return Response::failure(rejection.0);
    }
    log_error!("{operation:?} failed: {err:#}");
    Response::failure(operation.failure_message())
}
