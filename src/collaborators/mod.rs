//! Narrow interfaces to the platform-side helpers the coordinator drives.

pub mod report;
pub mod screenshot;

pub use report::{OutboxReporter, Report, ReportCollaborator};
pub use screenshot::{CaptureTarget, ForwardedCapture, ScreenshotCollaborator, TabInfo};
