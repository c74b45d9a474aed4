//! Data model shared by the scraping and deduplication engines
//!
//! - `JobPosting`: the normalized, immutable posting record
//! - `PostingDraft`: builder used by parser adapters
//! - `RateLimitConfig`, `ScrapingOptions`, `ScrapingMetrics`: scraper inputs and outputs

mod job;
mod scraping;

pub use job::{build_search_text, JobPosting, JobStatus, PostingDraft};
pub use scraping::{DelayRange, RateLimitConfig, ScrapingMetrics, ScrapingOptions};
