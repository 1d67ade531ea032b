//! Contact database schema bootstrap

use crate::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Open (or create) the contact database and initialize its tables
pub async fn connect(db_path: &Path) -> Result<SqlitePool> {
    // Proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to contact database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_store(&pool).await?;

    Ok(pool)
}

/// Initialize contact store tables
pub async fn init_store(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    create_groups_table(pool).await?;
    create_raw_contacts_table(pool).await?;
    create_contact_data_table(pool).await?;

    tracing::info!("Contact store tables initialized (groups, raw_contacts, contact_data)");

    Ok(())
}

/// Create the groups table
pub async fn create_groups_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS groups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            visible INTEGER NOT NULL DEFAULT 1,
            deleted INTEGER NOT NULL DEFAULT 0,
            account_name TEXT,
            account_type TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the raw_contacts table (parent contact records)
pub async fn create_raw_contacts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS raw_contacts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_name TEXT,
            account_type TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the contact_data table (child rows: names, phones, memberships)
pub async fn create_contact_data_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contact_data (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            raw_contact_id INTEGER NOT NULL REFERENCES raw_contacts(id),
            kind TEXT NOT NULL,
            display_name TEXT,
            phone_number TEXT,
            phone_subtype TEXT,
            group_id INTEGER REFERENCES groups(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
