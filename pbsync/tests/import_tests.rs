//! End-to-end import pipeline tests
//!
//! Exercises the full parse → resolve-group → batch-apply flow against an
//! in-memory SQLite contact store, including per-contact failure isolation
//! and the download completion boundary.

use pbsync::download::{DownloadComplete, DownloadId, DownloadStatus, Downloader};
use pbsync::events::ImportEvent;
use pbsync::session::ImportState;
use pbsync::{ImportError, Importer};
use pbsync_store::{schema, ContactStore, GroupRow, NewGroup, Operation, SqliteStore, StoreError};
use sqlx::SqlitePool;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

async fn create_test_store() -> SqliteStore {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    schema::init_store(&pool).await.expect("Failed to init schema");
    SqliteStore::new(pool)
}

fn write_feed(contents: &[u8]) -> tempfile::NamedTempFile {
    let mut feed = tempfile::NamedTempFile::new().expect("Failed to create temp feed");
    feed.write_all(contents).expect("Failed to write feed");
    feed
}

const FEED: &[u8] = br#"[{"name":"Alice","extension":"100"},{"extension":"200"}]"#;

#[tokio::test]
async fn test_end_to_end_import() {
    let store = create_test_store().await;
    let pool = store.pool().clone();
    let feed = write_feed(FEED);

    let mut importer = Importer::new(
        store,
        "http://example.org/phonebook".to_string(),
        "CCC Event".to_string(),
    );
    let summary = importer
        .import_file(feed.path())
        .await
        .expect("Import failed");

    assert_eq!(summary.imported, 2);
    assert!(summary.failed.is_empty());
    assert_eq!(importer.session().state, ImportState::Done);

    // Two contact records exist
    let (contacts,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM raw_contacts")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(contacts, 2);

    // Both are members of the group titled "CCC Event"
    let (group_id,): (i64,) = sqlx::query_as("SELECT id FROM groups WHERE title = 'CCC Event'")
        .fetch_one(&pool)
        .await
        .unwrap();
    let (members,): (i64,) = sqlx::query_as(
        "SELECT COUNT(DISTINCT raw_contact_id) FROM contact_data \
         WHERE kind = 'group_membership' AND group_id = ?",
    )
    .bind(group_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(members, 2);

    // First contact: display name Alice, phone 100 (mobile)
    let (alice_contact,): (i64,) = sqlx::query_as(
        "SELECT raw_contact_id FROM contact_data \
         WHERE kind = 'structured_name' AND display_name = 'Alice'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    let (number, subtype): (String, String) = sqlx::query_as(
        "SELECT phone_number, phone_subtype FROM contact_data \
         WHERE kind = 'phone' AND raw_contact_id = ?",
    )
    .bind(alice_contact)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(number, "100");
    assert_eq!(subtype, "mobile");

    // Second contact: phone 200 and no structured-name row
    let (second_contact,): (i64,) = sqlx::query_as(
        "SELECT raw_contact_id FROM contact_data WHERE kind = 'phone' AND phone_number = '200'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    let (names,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM contact_data WHERE kind = 'structured_name' AND raw_contact_id = ?",
    )
    .bind(second_contact)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(names, 0);
}

#[tokio::test]
async fn test_rerun_reinserts_contacts_but_reuses_group() {
    let store = create_test_store().await;
    let pool = store.pool().clone();
    let feed = write_feed(FEED);

    for _ in 0..2 {
        let mut importer = Importer::new(
            store.clone(),
            "http://example.org/phonebook".to_string(),
            "CCC Event".to_string(),
        );
        importer
            .import_file(feed.path())
            .await
            .expect("Import failed");
    }

    // No incremental sync: every run re-inserts its contacts
    let (contacts,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM raw_contacts")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(contacts, 4);

    // But the group is deduplicated by title
    let (groups,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM groups WHERE title = 'CCC Event'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(groups, 1);
}

/// Store wrapper that fails the first `fail_count` batch applies
struct FlakyStore {
    inner: SqliteStore,
    remaining_failures: AtomicUsize,
}

impl FlakyStore {
    fn new(inner: SqliteStore, fail_count: usize) -> Self {
        Self {
            inner,
            remaining_failures: AtomicUsize::new(fail_count),
        }
    }
}

impl ContactStore for FlakyStore {
    async fn group_rows(&self) -> pbsync_store::Result<Vec<GroupRow>> {
        self.inner.group_rows().await
    }

    async fn insert_group(&self, group: &NewGroup) -> pbsync_store::Result<()> {
        self.inner.insert_group(group).await
    }

    async fn apply_batch(&self, ops: &[Operation]) -> pbsync_store::Result<()> {
        if self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::BackRef("injected store failure".to_string()));
        }
        self.inner.apply_batch(ops).await
    }
}

#[tokio::test]
async fn test_single_contact_failure_does_not_abort_run() {
    let inner = create_test_store().await;
    let pool = inner.pool().clone();
    let store = FlakyStore::new(inner, 1);
    let feed = write_feed(FEED);

    let (event_tx, mut event_rx) = mpsc::channel(64);
    let mut importer = Importer::with_events(
        store,
        "http://example.org/phonebook".to_string(),
        "CCC Event".to_string(),
        event_tx,
    );
    let summary = importer
        .import_file(feed.path())
        .await
        .expect("Run must continue past a per-contact failure");

    // Contact #1 failed, contact #2 landed, and the run reached Done
    assert_eq!(summary.imported, 1);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].name.as_deref(), Some("Alice"));
    assert_eq!(summary.failed[0].extension.as_deref(), Some("100"));
    assert_eq!(importer.session().state, ImportState::Done);

    // Progress wording covers failed contacts too: both were processed
    assert_eq!(importer.session().progress.message, "Processed contact 2/2");

    let (contacts,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM raw_contacts")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(contacts, 1);
    let (number,): (String,) =
        sqlx::query_as("SELECT phone_number FROM contact_data WHERE kind = 'phone'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(number, "200");

    // A ContactFailed event was reported before the run completed
    drop(importer);
    let mut saw_failure = false;
    let mut saw_complete = false;
    while let Some(event) = event_rx.recv().await {
        match event {
            ImportEvent::ContactFailed { index, .. } => {
                assert_eq!(index, 0);
                saw_failure = true;
            }
            ImportEvent::SessionComplete {
                imported, failed, ..
            } => {
                assert_eq!(imported, 1);
                assert_eq!(failed, 1);
                saw_complete = true;
            }
            _ => {}
        }
    }
    assert!(saw_failure);
    assert!(saw_complete);
}

/// Store wrapper whose group inserts silently do nothing, so the target
/// group can never come into existence
struct GrouplessStore {
    inner: SqliteStore,
}

impl ContactStore for GrouplessStore {
    async fn group_rows(&self) -> pbsync_store::Result<Vec<GroupRow>> {
        self.inner.group_rows().await
    }

    async fn insert_group(&self, _group: &NewGroup) -> pbsync_store::Result<()> {
        Ok(())
    }

    async fn apply_batch(&self, ops: &[Operation]) -> pbsync_store::Result<()> {
        self.inner.apply_batch(ops).await
    }
}

#[tokio::test]
async fn test_group_creation_failure_aborts_run() {
    let inner = create_test_store().await;
    let pool = inner.pool().clone();
    let store = GrouplessStore { inner };
    let feed = write_feed(FEED);

    let mut importer = Importer::new(
        store,
        "http://example.org/phonebook".to_string(),
        "CCC Event".to_string(),
    );
    let err = importer.import_file(feed.path()).await.unwrap_err();

    assert!(matches!(err, ImportError::GroupCreation { ref title } if title == "CCC Event"));
    assert_eq!(importer.session().state, ImportState::Failed);

    // A setup failure must abort before any contact batch is applied
    let (contacts,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM raw_contacts")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(contacts, 0);
}

/// Downloader stub handing out a fixed identifier; completions are fed
/// into the channel by the test itself.
struct StubDownloader {
    id: DownloadId,
}

impl Downloader for StubDownloader {
    fn enqueue(&mut self, _url: &str) -> DownloadId {
        self.id
    }
}

#[tokio::test]
async fn test_run_proceeds_on_matching_completion() {
    let store = create_test_store().await;
    let pool = store.pool().clone();
    let feed = write_feed(FEED);

    let (tx, mut rx) = mpsc::channel(4);
    // A stale completion for another download must be ignored
    tx.send(DownloadComplete {
        id: DownloadId(41),
        status: DownloadStatus::Failed {
            error: "stale".to_string(),
        },
    })
    .await
    .unwrap();
    tx.send(DownloadComplete {
        id: DownloadId(42),
        status: DownloadStatus::Success {
            local_path: feed.path().to_path_buf(),
        },
    })
    .await
    .unwrap();

    let mut downloader = StubDownloader {
        id: DownloadId(42),
    };
    let mut importer = Importer::new(
        store,
        "http://example.org/phonebook".to_string(),
        "CCC Event".to_string(),
    );
    let summary = importer
        .run(&mut downloader, &mut rx)
        .await
        .expect("Run failed");

    assert_eq!(summary.imported, 2);
    let (contacts,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM raw_contacts")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(contacts, 2);

    // The spool file is cleaned up once its contents are imported
    assert!(!feed.path().exists());
}

#[tokio::test]
async fn test_run_aborts_on_failed_download() {
    let store = create_test_store().await;
    let pool = store.pool().clone();

    let (tx, mut rx) = mpsc::channel(1);
    tx.send(DownloadComplete {
        id: DownloadId(1),
        status: DownloadStatus::Failed {
            error: "404 Not Found".to_string(),
        },
    })
    .await
    .unwrap();

    let mut downloader = StubDownloader { id: DownloadId(1) };
    let mut importer = Importer::new(
        store,
        "http://example.org/phonebook".to_string(),
        "CCC Event".to_string(),
    );
    let err = importer.run(&mut downloader, &mut rx).await.unwrap_err();

    assert!(matches!(err, ImportError::Download(_)));
    assert_eq!(importer.session().state, ImportState::Failed);
    let (contacts,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM raw_contacts")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(contacts, 0);
}
