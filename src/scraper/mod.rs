//! Scraping engine
//!
//! This module orchestrates everything between "scrape this source" and a
//! list of postings:
//! - Per-source request admission with quota and jitter (`rate_limiter`)
//! - The HTTP request executor (`fetcher`)
//! - Exponential backoff for transient failures (`retry`)
//! - The page loop (`paging`)
//! - Protocol versions and the fallback state (`version`)
//! - The concrete [`SourceScraper`] and the [`ScraperRegistry`]

pub mod fetcher;
pub mod paging;
pub mod rate_limiter;
mod registry;
pub mod retry;
mod source;
pub mod version;

pub use fetcher::{HttpFetcher, PageFetcher};
pub use registry::{ScrapeReport, ScraperRegistry, SettingsPatch, SourceOutcome, SourceSettings};
pub use retry::RetryPolicy;
pub use source::{SourceDefinition, SourceScraper};
pub use version::FallbackState;

use async_trait::async_trait;

use crate::models::{JobPosting, RateLimitConfig, ScrapingMetrics, ScrapingOptions};
use crate::Result;

/// One scrapeable job board
///
/// Setters take `&self`; implementations keep their mutable settings behind
/// interior mutability so a scraper can be shared as `Arc<dyn Scraper>`.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Unique source name
    fn name(&self) -> &str;

    /// Scrapes listing pages until a bound or the last page is reached
    ///
    /// # Errors
    ///
    /// * `IngestError::AllVersionsFailed` - No registered protocol version
    ///   produced postings
    async fn scrape_jobs(&self, options: &ScrapingOptions) -> Result<Vec<JobPosting>>;

    /// Whether the source's base page currently loads
    async fn is_healthy(&self) -> bool;

    fn rate_limit(&self) -> RateLimitConfig;

    fn metrics(&self) -> ScrapingMetrics;

    /// Identifier of the active protocol version
    fn current_version(&self) -> String;

    fn set_rate_limit(&self, config: RateLimitConfig);

    fn set_retry_policy(&self, policy: RetryPolicy);
}
