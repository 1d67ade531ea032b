//! Feed download collaborator
//!
//! The pipeline does not fetch the feed itself: it enqueues a download,
//! receives a [`DownloadId`], and proceeds only when a completion event
//! carrying that identifier arrives. [`await_completion`] is the boundary
//! filter — completions for other identifiers are ignored. No retries.

use crate::error::{ImportError, Result};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("pbsync/", env!("CARGO_PKG_VERSION"));
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Identifier of one enqueued download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DownloadId(pub u64);

/// Terminal outcome of a download
#[derive(Debug, Clone)]
pub enum DownloadStatus {
    /// Feed bytes spooled to a local file
    Success { local_path: PathBuf },
    Failed { error: String },
}

/// Completion event emitted by the downloader
#[derive(Debug, Clone)]
pub struct DownloadComplete {
    pub id: DownloadId,
    pub status: DownloadStatus,
}

/// Download collaborator interface
///
/// Production use is [`HttpDownloader`]; tests substitute stubs that pair
/// with hand-fed completion channels.
pub trait Downloader {
    /// Enqueue a fetch of `url`. A completion event carrying the returned
    /// identifier follows on the downloader's event channel.
    fn enqueue(&mut self, url: &str) -> DownloadId;
}

/// HTTP downloader spooling feeds to local files
pub struct HttpDownloader {
    client: reqwest::Client,
    spool_dir: PathBuf,
    next_id: u64,
    event_tx: mpsc::Sender<DownloadComplete>,
}

impl HttpDownloader {
    pub fn new(spool_dir: PathBuf, event_tx: mpsc::Sender<DownloadComplete>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(|e| ImportError::Download(e.to_string()))?;

        Ok(Self {
            client,
            spool_dir,
            next_id: 1,
            event_tx,
        })
    }
}

impl Downloader for HttpDownloader {
    fn enqueue(&mut self, url: &str) -> DownloadId {
        let id = DownloadId(self.next_id);
        self.next_id += 1;

        let client = self.client.clone();
        let url = url.to_string();
        let local_path = self.spool_dir.join(format!("feed-{}.json", id.0));
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let status = match fetch_to_file(&client, &url, &local_path).await {
                Ok(()) => DownloadStatus::Success { local_path },
                Err(e) => {
                    warn!(url = %url, error = %e, "Feed download failed");
                    DownloadStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };
            let _ = event_tx.send(DownloadComplete { id, status }).await;
        });

        id
    }
}

async fn fetch_to_file(
    client: &reqwest::Client,
    url: &str,
    local_path: &std::path::Path,
) -> anyhow::Result<()> {
    debug!(url = %url, "Fetching feed");

    let response = client.get(url).send().await?.error_for_status()?;
    let bytes = response.bytes().await?;
    tokio::fs::write(local_path, &bytes).await?;

    debug!(
        path = %local_path.display(),
        size = bytes.len(),
        "Feed spooled"
    );
    Ok(())
}

/// Wait for the completion event matching `id`, ignoring completions for
/// other identifiers. Returns None if the downloader went away.
pub async fn await_completion(
    rx: &mut mpsc::Receiver<DownloadComplete>,
    id: DownloadId,
) -> Option<DownloadComplete> {
    while let Some(event) = rx.recv().await {
        if event.id != id {
            debug!(
                got = event.id.0,
                expected = id.0,
                "Ignoring completion for foreign download id"
            );
            continue;
        }
        return Some(event);
    }
    None
}
