//! pbsync - Phonebook Feed Import
//!
//! Downloads an event phonebook feed (JSON array of contacts), reconciles
//! it against the local contact store, and files every imported contact
//! into a named contact group. Each run re-imports the full feed; the
//! target group is created once and reused.

use anyhow::Result;
use clap::Parser;
use pbsync::config::{self, Cli};
use pbsync::download::HttpDownloader;
use pbsync::Importer;
use pbsync_store::{schema, SqliteStore};
use tokio::sync::mpsc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let config = config::resolve(&cli)?;

    info!("Starting pbsync");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Feed: {}", config.feed_url);
    info!("Group: {}", config.group_title);
    info!("Database: {}", config.database.display());

    if let Some(parent) = config.database.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::create_dir_all(&config.spool_dir)?;

    let pool = schema::connect(&config.database).await?;
    let store = SqliteStore::new(pool);

    let (download_tx, mut download_rx) = mpsc::channel(8);
    let mut downloader = HttpDownloader::new(config.spool_dir.clone(), download_tx)?;

    // Progress sink: render events as log lines in pipeline order
    let (event_tx, mut event_rx) = mpsc::channel::<pbsync::events::ImportEvent>(64);
    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            info!("{}", event.message());
        }
    });

    let mut importer = Importer::with_events(
        store,
        config.feed_url.clone(),
        config.group_title.clone(),
        event_tx,
    );
    let result = importer.run(&mut downloader, &mut download_rx).await;

    drop(importer);
    printer.await?;

    let summary = result?;
    info!(
        "Import complete: {} imported, {} failed",
        summary.imported,
        summary.failed.len()
    );

    Ok(())
}
