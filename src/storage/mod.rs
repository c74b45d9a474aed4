//! Storage module for persisting job postings
//!
//! This module handles:
//! - The [`JobStore`] query interface used by deduplication
//! - SQLite persistence with the apply link as the unique key
//! - An in-memory store for dry runs and tests

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryJobStore;
pub use sqlite::SqliteJobStore;
pub use traits::{JobStore, StorageError, StorageResult};

use crate::models::JobPosting;
use crate::IngestError;

use std::path::Path;

/// Opens (or creates) a SQLite job store
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteJobStore)` - Successfully initialized store
/// * `Err(IngestError)` - Failed to open the database
pub fn open_store(path: &Path) -> Result<SqliteJobStore, IngestError> {
    SqliteJobStore::new(path)
}

/// A posting together with its store id
#[derive(Debug, Clone, PartialEq)]
pub struct StoredJob {
    pub id: i64,
    pub posting: JobPosting,
}

/// What an upsert did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted(i64),
    Updated(i64),
}

impl UpsertOutcome {
    pub fn id(&self) -> i64 {
        match self {
            Self::Inserted(id) | Self::Updated(id) => *id,
        }
    }
}

/// Stored postings sharing a lower-cased (title, company)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleCompanyGroup {
    pub title: String,
    pub company: String,
    pub size: usize,
}

/// Key under which postings are grouped as likely duplicates
pub(crate) fn group_key(title: &str, company: &str) -> (String, String) {
    (title.trim().to_lowercase(), company.trim().to_lowercase())
}
