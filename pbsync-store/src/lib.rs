//! Contact store access for pbsync
//!
//! Models the local contact database that imported phonebook entries are
//! written into: group rows, batch mutation operations with positional
//! back references, and an SQLite-backed implementation.

pub mod ops;
pub mod schema;
pub mod sqlite;

pub use ops::{Field, Operation, PhoneSubtype, RowRef};
pub use sqlite::SqliteStore;

use thiserror::Error;

/// Store-assigned opaque group identifier
pub type GroupId = i64;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Contact store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A child operation's back reference could not be resolved
    #[error("Invalid back reference: {0}")]
    BackRef(String),
}

/// One group row as returned by a discovery scan (visible, non-deleted)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRow {
    pub id: GroupId,
    pub title: String,
}

/// A group to be inserted
#[derive(Debug, Clone)]
pub struct NewGroup {
    pub title: String,
    pub visible: bool,
    pub account_name: Option<String>,
    pub account_type: Option<String>,
}

/// Contact store collaborator interface
///
/// Implemented by [`SqliteStore`] for production use; tests substitute
/// in-memory or fault-injecting implementations at this seam.
pub trait ContactStore {
    /// Scan groups that are visible and not deleted. Row order is
    /// store-defined and not guaranteed stable across runs.
    fn group_rows(&self) -> impl std::future::Future<Output = Result<Vec<GroupRow>>> + Send;

    /// Insert a new group row
    fn insert_group(&self, group: &NewGroup) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Apply an ordered operation batch atomically (all-or-nothing),
    /// resolving positional back references to real row ids as parent
    /// rows are inserted.
    fn apply_batch(&self, ops: &[Operation]) -> impl std::future::Future<Output = Result<()>> + Send;
}
