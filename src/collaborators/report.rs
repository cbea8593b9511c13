use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;

use crate::runtime::StateSnapshot;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub subject: String,
    pub body: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub generated_at: DateTime<Utc>,
}

#[async_trait]
pub trait ReportCollaborator: Send + Sync {
    async fn generate_report(&self, snapshot: &StateSnapshot) -> Result<Report>;

    /// `Ok(false)` means the report was understood but not delivered.
    async fn send_report(&self, report: &Report, address: &str) -> Result<bool>;
}

/// Writes each report as a small RFC 822 style message into an outbox
/// directory, for a mail client or sync job to pick up.
pub struct OutboxReporter {
    dir: PathBuf,
}

impl OutboxReporter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl ReportCollaborator for OutboxReporter {
    async fn generate_report(&self, snapshot: &StateSnapshot) -> Result<Report> {
        let generated_at = Utc::now();
        let day = generated_at.format("%a %b %d %Y");
        let options = &snapshot.settings.email_reports;

        let mut lines = vec![
            format!("Activity report for {day}:"),
            format!("- Total interactions: {}", snapshot.total_interactions),
        ];
        if options.include_activity_log.unwrap_or(true) {
            lines.push(format!("- Activities logged: {}", snapshot.activity_count));
        }
        if options.include_screenshots.unwrap_or(true) {
            lines.push(format!("- Screenshots captured: {}", snapshot.screenshot_count));
        }
        if options.include_todos.unwrap_or(true) {
            lines.push(format!("- Todos: {}", snapshot.todo_count));
        }
        lines.push(format!("- AI model: {}", snapshot.current_model.name));

        Ok(Report {
            subject: format!("Tabpilot report ({day})"),
            body: lines.join("\n"),
            generated_at,
        })
    }

    async fn send_report(&self, report: &Report, address: &str) -> Result<bool> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create outbox {}", self.dir.display()))?;

        let path = self.dir.join(format!(
            "report-{}.eml",
            report.generated_at.timestamp_millis()
        ));
        let message = format!(
            "To: {address}\r\nSubject: {}\r\nDate: {}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}\r\n",
            report.subject,
            report.generated_at.to_rfc2822(),
            report.body
        );

        tokio::fs::write(&path, message)
            .await
            .with_context(|| format!("failed to write report to {}", path.display()))?;

        info!("Report queued at {}", path.display());
        Ok(true)
    }
}
