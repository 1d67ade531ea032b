//! Configuration resolution
//!
//! Every setting follows the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`PBSYNC_*`, via clap)
//! 3. TOML config file (`~/.config/pbsync/config.toml`)
//! 4. Compiled default (fallback)

use crate::error::{ImportError, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Feed URL of the Eventphone GURU phonebook
pub const DEFAULT_FEED_URL: &str = "http://www.eventphone.de/guru2/phonebook?format=json";

/// Contact group imported entries are made members of
pub const DEFAULT_GROUP_TITLE: &str = "CCC Event";

/// Command-line interface
#[derive(Parser, Debug, Default)]
#[command(name = "pbsync", about = "Import an event phonebook feed into the local contact store")]
pub struct Cli {
    /// Feed URL to download
    #[arg(long, env = "PBSYNC_FEED_URL")]
    pub feed_url: Option<String>,

    /// Title of the contact group to import into
    #[arg(long, env = "PBSYNC_GROUP_TITLE")]
    pub group_title: Option<String>,

    /// Contact database path
    #[arg(long, env = "PBSYNC_DATABASE")]
    pub database: Option<PathBuf>,

    /// Directory downloaded feeds are spooled into
    #[arg(long, env = "PBSYNC_SPOOL_DIR")]
    pub spool_dir: Option<PathBuf>,

    /// Explicit config file path (default: ~/.config/pbsync/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Optional settings from the TOML config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub feed_url: Option<String>,
    pub group_title: Option<String>,
    pub database: Option<PathBuf>,
    pub spool_dir: Option<PathBuf>,
}

/// Fully resolved configuration
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub feed_url: String,
    pub group_title: String,
    pub database: PathBuf,
    pub spool_dir: PathBuf,
}

/// Resolve configuration from CLI/env, config file and defaults
pub fn resolve(cli: &Cli) -> Result<FeedConfig> {
    let file = load_config_file(cli.config.as_deref())?;
    Ok(resolve_with(cli, file))
}

/// Pure merge of the three layers (testable without the filesystem)
pub fn resolve_with(cli: &Cli, file: TomlConfig) -> FeedConfig {
    let data_dir = default_data_dir();

    FeedConfig {
        feed_url: cli
            .feed_url
            .clone()
            .or(file.feed_url)
            .unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
        group_title: cli
            .group_title
            .clone()
            .or(file.group_title)
            .unwrap_or_else(|| DEFAULT_GROUP_TITLE.to_string()),
        database: cli
            .database
            .clone()
            .or(file.database)
            .unwrap_or_else(|| data_dir.join("contacts.db")),
        spool_dir: cli
            .spool_dir
            .clone()
            .or(file.spool_dir)
            .unwrap_or_else(|| data_dir.join("spool")),
    }
}

/// Load the TOML config file. A missing default file is not an error; an
/// explicitly named file must exist and parse.
fn load_config_file(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let Some(default) = default_config_path() else {
                return Ok(TomlConfig::default());
            };
            if !default.exists() {
                return Ok(TomlConfig::default());
            }
            default
        }
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| ImportError::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| ImportError::Config(format!("Parse {} failed: {}", path.display(), e)))
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pbsync").join("config.toml"))
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("pbsync"))
        .unwrap_or_else(|| PathBuf::from("./pbsync_data"))
}
