//! Source scraper with protocol-version fallback
//!
//! A [`SourceScraper`] scrapes one job board with its active parser version.
//! When the first page fails, it fetches the base page, looks for a version
//! whose layout fingerprints match, and falls back through the remaining
//! versions in registration order before giving up.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::models::{DelayRange, JobPosting, RateLimitConfig, ScrapingMetrics, ScrapingOptions};
use crate::parsers::{JobParser, SelectorParser, SelectorTable};
use crate::scraper::fetcher::PageFetcher;
use crate::scraper::paging::{paginate, PageLoop};
use crate::scraper::rate_limiter::{lock, RateLimiter};
use crate::scraper::retry::RetryPolicy;
use crate::scraper::version::{FallbackState, VersionSet};
use crate::scraper::Scraper;
use crate::{ConfigError, IngestError, Result};

/// Resolved description of one source
#[derive(Debug, Clone)]
pub struct SourceDefinition {
    pub name: String,
    pub base_url: Url,
    /// Listing URL with a `{page}` placeholder
    pub page_url: String,
    /// Layout versions in registration order
    pub versions: Vec<SelectorTable>,
    /// Version to start with; the first one when absent
    pub active_version: Option<String>,
    pub rate_limit: RateLimitConfig,
    pub retry: RetryPolicy,
    pub page_delay: DelayRange,
}

/// Scraper for one configured job board
pub struct SourceScraper {
    name: String,
    base_url: Url,
    page_url: String,
    limiter: RateLimiter,
    versions: Mutex<VersionSet>,
    retry: Mutex<RetryPolicy>,
    page_delay: DelayRange,
    last_scraped: Mutex<Option<DateTime<Utc>>>,
}

impl SourceScraper {
    /// Compiles the source's selector tables and starts its rate limiter
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `definition` - URLs, versions and pacing of the source
    /// * `fetcher` - Request executor shared by all sources
    ///
    /// # Returns
    ///
    /// * `Ok(SourceScraper)` - Ready to scrape
    /// * `Err(IngestError::Config)` - A selector is invalid, or the active
    ///   version is unknown
    pub fn new(definition: SourceDefinition, fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        let parsers = definition
            .versions
            .into_iter()
            .map(|table| {
                SelectorParser::new(&definition.name, definition.base_url.clone(), table)
                    .map(|p| Arc::new(p) as Arc<dyn JobParser>)
            })
            .collect::<Result<Vec<_>>>()?;

        Self::with_parsers(
            &definition.name,
            definition.base_url,
            definition.page_url,
            parsers,
            definition.active_version.as_deref(),
            definition.rate_limit,
            definition.retry,
            definition.page_delay,
            fetcher,
        )
    }

    /// Builds a scraper from already constructed parser versions
    #[allow(clippy::too_many_arguments)]
    pub fn with_parsers(
        name: &str,
        base_url: Url,
        page_url: String,
        parsers: Vec<Arc<dyn JobParser>>,
        active_version: Option<&str>,
        rate_limit: RateLimitConfig,
        retry: RetryPolicy,
        page_delay: DelayRange,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Result<Self> {
        let versions = VersionSet::new(parsers, active_version).ok_or_else(|| {
            ConfigError::Validation(format!(
                "Source '{}' has no version '{}'",
                name,
                active_version.unwrap_or("<first>")
            ))
        })?;

        Ok(Self {
            name: name.to_string(),
            base_url,
            page_url,
            limiter: RateLimiter::new(name, rate_limit, fetcher),
            versions: Mutex::new(versions),
            retry: Mutex::new(retry),
            page_delay,
            last_scraped: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn fallback_state(&self) -> FallbackState {
        lock(&self.versions).state()
    }

    fn set_state(&self, state: FallbackState) {
        lock(&self.versions).set_state(state);
    }

    async fn scrape_with(
        &self,
        parser: Arc<dyn JobParser>,
        options: &ScrapingOptions,
    ) -> Result<Vec<JobPosting>> {
        let run = PageLoop {
            source: &self.name,
            page_url: &self.page_url,
            limiter: &self.limiter,
            parser,
            retry: *lock(&self.retry),
            page_delay: self.page_delay,
        };
        paginate(&run, options).await
    }

    /// Fetches the base page and returns the version whose layout it shows
    async fn detect_version(&self) -> Option<usize> {
        match self.limiter.admit(self.base_url.as_str()).await {
            Ok(html) => lock(&self.versions).detect(&html),
            Err(e) => {
                warn!(
                    source = %self.name,
                    error = %e,
                    "Could not load base page for layout detection"
                );
                None
            }
        }
    }

    fn finish(&self, jobs: Vec<JobPosting>) -> Vec<JobPosting> {
        *lock(&self.last_scraped) = Some(Utc::now());
        info!(
            source = %self.name,
            version = %self.current_version(),
            jobs = jobs.len(),
            "Scrape finished"
        );
        jobs
    }

    fn promote(&self, index: usize) {
        let mut versions = lock(&self.versions);
        versions.set_active(index);
        versions.set_state(FallbackState::UsingFallback);
    }
}

#[async_trait]
impl Scraper for SourceScraper {
    fn name(&self) -> &str {
        &self.name
    }

    async fn scrape_jobs(&self, options: &ScrapingOptions) -> Result<Vec<JobPosting>> {
        let (original, parser) = {
            let mut versions = lock(&self.versions);
            versions.set_state(FallbackState::UsingCurrent);
            (versions.active_index(), versions.active_parser())
        };
        let original_version = parser.version().to_string();
        debug!(source = %self.name, version = %original_version, "Starting scrape");

        let first_error = match self.scrape_with(parser, options).await {
            Ok(jobs) => return Ok(self.finish(jobs)),
            Err(e) => e,
        };
        warn!(
            source = %self.name,
            version = %original_version,
            error = %first_error,
            "Active version failed, detecting layout"
        );
        self.set_state(FallbackState::Detecting);

        let mut tried = vec![original];

        if let Some(detected) = self.detect_version().await.filter(|i| *i != original) {
            self.promote(detected);
            let parser = lock(&self.versions).active_parser();
            info!(
                source = %self.name,
                version = %parser.version(),
                "Layout detected, retrying scrape"
            );

            match self.scrape_with(parser, options).await {
                Ok(jobs) => return Ok(self.finish(jobs)),
                Err(e) => warn!(source = %self.name, error = %e, "Detected version failed too"),
            }
            tried.push(detected);
        } else {
            debug!(source = %self.name, "Layout detection inconclusive");
        }

        let remaining = lock(&self.versions).untried(&tried);
        for index in remaining {
            let parser = lock(&self.versions).parser(index);
            let Some(parser) = parser else {
                continue;
            };
            let version = parser.version().to_string();

            match self.scrape_with(parser, options).await {
                Ok(jobs) => {
                    self.promote(index);
                    info!(source = %self.name, version = %version, "Fallback version promoted");
                    return Ok(self.finish(jobs));
                }
                Err(e) => {
                    warn!(
                        source = %self.name,
                        version = %version,
                        error = %e,
                        "Fallback version failed"
                    )
                }
            }
        }

        {
            let mut versions = lock(&self.versions);
            versions.set_active(original);
            versions.set_state(FallbackState::Failed);
        }
        error!(source = %self.name, "All scraper versions failed");
        Err(IngestError::AllVersionsFailed {
            source_name: self.name.clone(),
        })
    }

    async fn is_healthy(&self) -> bool {
        match self.limiter.admit(self.base_url.as_str()).await {
            Ok(_) => true,
            Err(e) => {
                debug!(source = %self.name, error = %e, "Health check failed");
                false
            }
        }
    }

    fn rate_limit(&self) -> RateLimitConfig {
        self.limiter.config()
    }

    fn metrics(&self) -> ScrapingMetrics {
        let mut metrics = self.limiter.metrics();
        metrics.last_scraped_at = *lock(&self.last_scraped);
        metrics.active_protocol_version = self.current_version();
        metrics
    }

    fn current_version(&self) -> String {
        lock(&self.versions).active_version().to_string()
    }

    fn set_rate_limit(&self, config: RateLimitConfig) {
        self.limiter.set_config(config);
    }

    fn set_retry_policy(&self, policy: RetryPolicy) {
        *lock(&self.retry) = policy;
    }
}
