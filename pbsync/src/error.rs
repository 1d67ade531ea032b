//! Error types for the import pipeline

use pbsync_store::StoreError;
use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// Import pipeline errors
///
/// `Feed` and `GroupCreation` abort the entire run; `ContactImport` is
/// per-contact, reported and skipped so the run continues.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Structural feed parse failure (aborts before any import)
    #[error("Malformed feed: {0}")]
    Feed(#[from] crate::feed::FeedError),

    /// Download collaborator signalled failure, or went away
    #[error("Download failed: {0}")]
    Download(String),

    /// Inserting the target group did not yield a discoverable group
    #[error("Could not create contact group {title:?}")]
    GroupCreation { title: String },

    /// A single contact's batch apply failed
    #[error("Import failed for contact {name:?} ({extension:?}): {source}")]
    ContactImport {
        name: Option<String>,
        extension: Option<String>,
        source: StoreError,
    },

    /// Store error outside a per-contact batch (group scan/insert)
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
