//! Storage traits and error types
//!
//! This module defines the query and write interface the deduplication engine
//! and the ingest pipeline rely on, and the associated error types.

use crate::models::JobPosting;
use crate::storage::{StoredJob, TitleCompanyGroup, UpsertOutcome};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Job not found: {0}")]
    NotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for job store implementations
///
/// Methods take `&self` so a store can be shared between the deduplication
/// engine and the pipeline; implementations synchronize internally.
pub trait JobStore: Send + Sync {
    // ===== Lookups =====

    /// Finds the posting stored under an apply link
    fn find_by_apply_link(&self, apply_link: &str) -> StorageResult<Option<StoredJob>>;

    /// Finds postings whose title and company match, ignoring case and
    /// surrounding whitespace
    fn find_by_title_company(&self, title: &str, company: &str) -> StorageResult<Vec<StoredJob>>;

    /// Finds postings whose search text contains `query` (case-insensitive)
    ///
    /// # Arguments
    ///
    /// * `query` - Free text to look for
    /// * `limit` - Maximum number of results, newest first
    fn search(&self, query: &str, limit: usize) -> StorageResult<Vec<StoredJob>>;

    /// Finds postings whose location contains `location` (case-insensitive)
    fn find_by_location(&self, location: &str, limit: usize) -> StorageResult<Vec<StoredJob>>;

    // ===== Writes =====

    /// Inserts a new posting and returns its id
    ///
    /// Fails with `ConstraintViolation` if the apply link is already stored.
    fn insert(&self, posting: &JobPosting) -> StorageResult<i64>;

    /// Replaces the scraped fields of a stored posting
    ///
    /// Appliedness and the original scrape date of the stored row are kept.
    fn update(&self, id: i64, posting: &JobPosting) -> StorageResult<()>;

    /// Inserts the posting, or updates the row that has the same apply link
    fn upsert(&self, posting: &JobPosting) -> StorageResult<UpsertOutcome>;

    // ===== Statistics =====

    /// Total number of stored postings
    fn count(&self) -> StorageResult<usize>;

    /// Groups of more than one posting sharing a lower-cased (title, company)
    fn title_company_groups(&self) -> StorageResult<Vec<TitleCompanyGroup>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(StorageError::NotFound(7).to_string(), "Job not found: 7");
        assert_eq!(
            StorageError::ConstraintViolation("apply_link".to_string()).to_string(),
            "Constraint violation: apply_link"
        );
    }
}
