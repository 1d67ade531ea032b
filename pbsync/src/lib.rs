//! pbsync library interface
//!
//! Exposes the feed parser, group resolver, batch builder and pipeline
//! orchestrator for integration testing.

pub mod batch;
pub mod config;
pub mod download;
pub mod error;
pub mod events;
pub mod feed;
pub mod group;
pub mod pipeline;
pub mod session;

pub use crate::error::{ImportError, Result};
pub use crate::feed::Contact;
pub use crate::pipeline::{ImportSummary, Importer};
