//! Parser adapters that turn one page of job-board HTML into postings
//!
//! This module contains:
//! - The [`JobParser`] contract every protocol version implements
//! - Shared extraction helpers (`extract`)
//! - The flexible date routine (`date`)
//! - [`SelectorParser`], an adapter driven by a selector table

pub mod date;
pub mod extract;
mod selector;

pub use date::{parse_flexible_date, parse_flexible_date_at};
pub use selector::{SelectorParser, SelectorTable};

use crate::models::JobPosting;
use crate::Result;

/// One protocol version of a source's page parser
///
/// Implementations must tolerate malformed items: an item missing a required
/// field is dropped and logged, never turned into an error for the page.
pub trait JobParser: Send + Sync {
    /// Identifier of this layout version (e.g. "v2")
    fn version(&self) -> &str;

    /// Extracts all postings from one listing page
    fn parse_jobs(&self, html: &str) -> Result<Vec<JobPosting>>;

    /// Whether the page advertises a following page
    ///
    /// Adapters that cannot tell keep paging until a page comes back empty.
    fn has_next_page(&self, _html: &str) -> bool {
        true
    }

    /// Page number the markup reports for itself
    fn current_page(&self, _html: &str) -> u32 {
        1
    }

    /// Whether the markup carries this version's structural fingerprints
    fn matches_layout(&self, html: &str) -> bool;
}
