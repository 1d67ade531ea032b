//! Import session state machine
//!
//! A run progresses linearly:
//! IDLE → DOWNLOADING → PARSING → IMPORTING → DONE,
//! with terminal FAILED reachable from PARSING or IMPORTING. Per-contact
//! batch failures do not fail the session; they accumulate on it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Import workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImportState {
    /// Nothing in flight
    Idle,
    /// Waiting on the download collaborator
    Downloading,
    /// Materializing the feed into typed contacts
    Parsing,
    /// Applying one batch per contact
    Importing,
    /// Every contact attempted (success or reported failure)
    Done,
    /// Run aborted (parse or group setup failure)
    Failed,
}

/// Progress tracking
#[derive(Debug, Clone, Serialize)]
pub struct ImportProgress {
    /// Contacts attempted so far
    pub current: usize,
    /// Total contacts in the feed
    pub total: usize,
    /// Current operation description
    pub message: String,
}

/// A single contact whose batch apply failed (reported, not fatal)
#[derive(Debug, Clone, Serialize)]
pub struct ContactFailure {
    pub name: Option<String>,
    pub extension: Option<String>,
    pub error: String,
}

/// Import session (in-memory state for one pipeline run)
#[derive(Debug, Clone, Serialize)]
pub struct ImportSession {
    /// Unique session identifier
    pub session_id: Uuid,

    /// Current workflow state
    pub state: ImportState,

    /// Feed URL being imported
    pub feed_url: String,

    /// Target contact group title
    pub group_title: String,

    /// Progress tracking
    pub progress: ImportProgress,

    /// Accumulated per-contact failures
    pub failures: Vec<ContactFailure>,

    /// Session start time
    pub started_at: DateTime<Utc>,

    /// Session end time (if done/failed)
    pub ended_at: Option<DateTime<Utc>>,
}

impl ImportSession {
    /// Create a new idle session
    pub fn new(feed_url: String, group_title: String) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            state: ImportState::Idle,
            feed_url,
            group_title,
            progress: ImportProgress::default(),
            failures: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to a new state
    pub fn transition_to(&mut self, new_state: ImportState) {
        self.state = new_state;

        // Set end time for terminal states
        if matches!(new_state, ImportState::Done | ImportState::Failed) {
            self.ended_at = Some(Utc::now());
        }
    }

    /// Update progress
    pub fn update_progress(&mut self, current: usize, total: usize, message: String) {
        self.progress.current = current;
        self.progress.total = total;
        self.progress.message = message;
    }

    /// Record a per-contact failure
    pub fn add_failure(&mut self, failure: ContactFailure) {
        self.failures.push(failure);
    }

    /// Check if the session is terminal (finished)
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, ImportState::Done | ImportState::Failed)
    }
}

impl Default for ImportProgress {
    fn default() -> Self {
        Self {
            current: 0,
            total: 0,
            message: String::from("Idle"),
        }
    }
}
