//! Progress events emitted during an import run
//!
//! Events are broadcast over an mpsc channel in pipeline order. The binary
//! renders them to the text progress sink via [`ImportEvent::message`];
//! consumers that want structure serialize them instead.

use serde::Serialize;
use uuid::Uuid;

/// Events emitted during import
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImportEvent {
    /// Run started, download enqueued
    SessionStarted { session_id: Uuid, feed_url: String },

    /// Download collaborator reported success for our identifier
    DownloadFinished { session_id: Uuid },

    /// Entire feed materialized into typed contacts
    ParseComplete { session_id: Uuid, contacts: usize },

    /// One contact's batch applied
    ContactImported {
        session_id: Uuid,
        index: usize,
        total: usize,
        name: Option<String>,
        extension: Option<String>,
    },

    /// One contact's batch failed (reported, run continues)
    ContactFailed {
        session_id: Uuid,
        index: usize,
        error: String,
    },

    /// Every contact attempted
    SessionComplete {
        session_id: Uuid,
        imported: usize,
        failed: usize,
    },

    /// Run aborted (parse, group setup or download failure)
    SessionFailed { session_id: Uuid, error: String },
}

impl ImportEvent {
    /// Human-readable status line for the progress sink
    pub fn message(&self) -> String {
        match self {
            Self::SessionStarted { feed_url, .. } => {
                format!("Starting download from {}", feed_url)
            }
            Self::DownloadFinished { .. } => "Download finished.".to_string(),
            Self::ParseComplete { contacts, .. } => {
                format!("Parsing finished. {} contacts.", contacts)
            }
            Self::ContactImported {
                name, extension, ..
            } => {
                format!(
                    "Added {} ({}).",
                    name.as_deref().unwrap_or("(unnamed)"),
                    extension.as_deref().unwrap_or("-")
                )
            }
            Self::ContactFailed { index, error, .. } => {
                format!("Failed to add contact {}: {}", index + 1, error)
            }
            Self::SessionComplete { imported, failed, .. } => {
                format!("Done. {} imported, {} failed.", imported, failed)
            }
            Self::SessionFailed { error, .. } => format!("Import failed: {}", error),
        }
    }
}
