//! Import pipeline orchestrator
//!
//! Drives one run end to end: wait for the download completion matching
//! the enqueued identifier, materialize the whole feed into memory,
//! resolve the target group once, then apply one batch per contact
//! sequentially. A late parse failure therefore aborts before any import
//! side effect, while a single contact's batch failure is reported and
//! does not stop the remaining contacts.

use crate::batch::build_batch;
use crate::download::{await_completion, DownloadComplete, Downloader, DownloadStatus};
use crate::error::{ImportError, Result};
use crate::events::ImportEvent;
use crate::feed::{parse_contacts, Contact};
use crate::group::resolve_or_create_group;
use crate::session::{ContactFailure, ImportSession, ImportState};
use pbsync_store::ContactStore;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Outcome of one completed run
#[derive(Debug, Clone)]
pub struct ImportSummary {
    /// Contacts whose batch applied
    pub imported: usize,
    /// Contacts whose batch failed (already reported)
    pub failed: Vec<ContactFailure>,
}

/// Pipeline orchestrator for one import run
pub struct Importer<S> {
    store: S,
    session: ImportSession,
    event_tx: Option<mpsc::Sender<ImportEvent>>,
}

impl<S: ContactStore> Importer<S> {
    /// Create a new importer for one run
    pub fn new(store: S, feed_url: String, group_title: String) -> Self {
        Self {
            store,
            session: ImportSession::new(feed_url, group_title),
            event_tx: None,
        }
    }

    /// Create an importer with a progress event channel
    pub fn with_events(
        store: S,
        feed_url: String,
        group_title: String,
        event_tx: mpsc::Sender<ImportEvent>,
    ) -> Self {
        Self {
            store,
            session: ImportSession::new(feed_url, group_title),
            event_tx: Some(event_tx),
        }
    }

    pub fn session(&self) -> &ImportSession {
        &self.session
    }

    /// Run the full pipeline: enqueue the download, wait for its
    /// completion signal, then import the spooled feed file. The spool
    /// file is removed after a successful import; a failed run leaves it
    /// in place for inspection.
    pub async fn run<D: Downloader>(
        &mut self,
        downloader: &mut D,
        completions: &mut mpsc::Receiver<DownloadComplete>,
    ) -> Result<ImportSummary> {
        self.session.transition_to(ImportState::Downloading);
        self.emit(ImportEvent::SessionStarted {
            session_id: self.session.session_id,
            feed_url: self.session.feed_url.clone(),
        })
        .await;

        let id = downloader.enqueue(&self.session.feed_url);
        info!(
            session_id = %self.session.session_id,
            download_id = id.0,
            url = %self.session.feed_url,
            "Download enqueued"
        );

        let Some(completion) = await_completion(completions, id).await else {
            let e = ImportError::Download("download collaborator went away".to_string());
            self.fail(&e).await;
            return Err(e);
        };

        match completion.status {
            DownloadStatus::Success { local_path } => {
                self.emit(ImportEvent::DownloadFinished {
                    session_id: self.session.session_id,
                })
                .await;
                let result = self.import_file(&local_path).await;
                if result.is_ok() {
                    if let Err(e) = tokio::fs::remove_file(&local_path).await {
                        warn!(
                            path = %local_path.display(),
                            error = %e,
                            "Failed to remove spool file"
                        );
                    }
                }
                result
            }
            DownloadStatus::Failed { error } => {
                let e = ImportError::Download(error);
                self.fail(&e).await;
                Err(e)
            }
        }
    }

    /// Import an already-downloaded feed file
    pub async fn import_file(&mut self, path: &Path) -> Result<ImportSummary> {
        // Phase 1: Parsing - materialize the entire feed before touching
        // the store, so a parse failure has no import side effects.
        self.session.transition_to(ImportState::Parsing);
        self.session
            .update_progress(0, 0, "Parsing feed...".to_string());
        info!(
            session_id = %self.session.session_id,
            path = %path.display(),
            "Parsing feed"
        );

        let contacts = match read_feed(path) {
            Ok(contacts) => contacts,
            Err(e) => {
                self.fail(&e).await;
                return Err(e);
            }
        };
        let total = contacts.len();

        self.emit(ImportEvent::ParseComplete {
            session_id: self.session.session_id,
            contacts: total,
        })
        .await;
        info!(
            session_id = %self.session.session_id,
            contacts = total,
            "Feed parsed"
        );

        // Phase 2: Importing - resolve the group once, then one batch per
        // contact, sequentially.
        self.session.transition_to(ImportState::Importing);
        self.session
            .update_progress(0, total, "Importing contacts...".to_string());

        let group_title = self.session.group_title.clone();
        let group_id = match resolve_or_create_group(&self.store, &group_title).await {
            Ok(id) => id,
            Err(e) => {
                self.fail(&e).await;
                return Err(e);
            }
        };
        info!(
            session_id = %self.session.session_id,
            group = %group_title,
            group_id = group_id,
            "Target group resolved"
        );

        let mut imported = 0;
        for (index, contact) in contacts.iter().enumerate() {
            match self.import_contact(contact, group_id).await {
                Ok(()) => {
                    imported += 1;
                    self.emit(ImportEvent::ContactImported {
                        session_id: self.session.session_id,
                        index,
                        total,
                        name: contact.name.clone(),
                        extension: contact.extension.clone(),
                    })
                    .await;
                }
                Err(e) => {
                    // Per-contact error isolation: report and continue
                    warn!(
                        session_id = %self.session.session_id,
                        index = index,
                        error = %e,
                        "Contact import failed (non-fatal, continuing)"
                    );
                    self.session.add_failure(ContactFailure {
                        name: contact.name.clone(),
                        extension: contact.extension.clone(),
                        error: e.to_string(),
                    });
                    self.emit(ImportEvent::ContactFailed {
                        session_id: self.session.session_id,
                        index,
                        error: e.to_string(),
                    })
                    .await;
                }
            }

            self.session.update_progress(
                index + 1,
                total,
                format!("Processed contact {}/{}", index + 1, total),
            );
        }

        self.session.transition_to(ImportState::Done);
        let failed = self.session.failures.clone();
        self.emit(ImportEvent::SessionComplete {
            session_id: self.session.session_id,
            imported,
            failed: failed.len(),
        })
        .await;
        info!(
            session_id = %self.session.session_id,
            imported = imported,
            failed = failed.len(),
            "Import run complete"
        );

        Ok(ImportSummary { imported, failed })
    }

    /// Build and apply one contact's batch
    async fn import_contact(&self, contact: &Contact, group_id: pbsync_store::GroupId) -> Result<()> {
        let ops = build_batch(contact, group_id);
        self.store
            .apply_batch(&ops)
            .await
            .map_err(|source| ImportError::ContactImport {
                name: contact.name.clone(),
                extension: contact.extension.clone(),
                source,
            })
    }

    /// Transition to Failed and report the aborting error
    async fn fail(&mut self, error: &ImportError) {
        self.session.transition_to(ImportState::Failed);
        self.emit(ImportEvent::SessionFailed {
            session_id: self.session.session_id,
            error: error.to_string(),
        })
        .await;
    }

    /// Emit a progress event if a channel is configured
    async fn emit(&self, event: ImportEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }
}

/// Open and fully parse a spooled feed file
fn read_feed(path: &Path) -> Result<Vec<Contact>> {
    let file = File::open(path)?;
    let contacts = parse_contacts(BufReader::new(file)).collect::<std::result::Result<_, _>>()?;
    Ok(contacts)
}
