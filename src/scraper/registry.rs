//! Scraper registry
//!
//! Keeps every configured source with its settings, runs them, and isolates
//! their failures: one source failing never prevents the others from running
//! and never turns into an error for the caller.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::{JobPosting, RateLimitConfig, ScrapingMetrics, ScrapingOptions};
use crate::scraper::fetcher::PageFetcher;
use crate::scraper::retry::RetryPolicy;
use crate::scraper::source::SourceScraper;
use crate::scraper::Scraper;
use crate::{IngestError, Result};

/// Registry-level settings of one source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSettings {
    pub enabled: bool,
    pub rate_limit: RateLimitConfig,
    pub retry: RetryPolicy,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            rate_limit: RateLimitConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Partial update of [`SourceSettings`]; `None` keeps the current value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub enabled: Option<bool>,
    pub rate_limit: Option<RateLimitConfig>,
    pub retry: Option<RetryPolicy>,
}

/// Result of scraping one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    pub source: String,
    pub jobs_found: usize,
    pub error: Option<String>,
    /// Protocol version active after the scrape
    pub version: String,
}

impl SourceOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Postings and per-source outcomes of one registry run
#[derive(Debug, Clone, Default)]
pub struct ScrapeReport {
    pub postings: Vec<JobPosting>,
    pub outcomes: Vec<SourceOutcome>,
}

impl ScrapeReport {
    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    fn record(&mut self, scraper: &dyn Scraper, result: Result<Vec<JobPosting>>) {
        let source = scraper.name().to_string();
        let version = scraper.current_version();
        match result {
            Ok(jobs) => {
                info!(source = %source, jobs = jobs.len(), version = %version, "Source scraped");
                self.outcomes.push(SourceOutcome {
                    source,
                    jobs_found: jobs.len(),
                    error: None,
                    version,
                });
                self.postings.extend(jobs);
            }
            Err(e) => {
                error!(source = %source, error = %e, "Source failed");
                self.outcomes.push(SourceOutcome {
                    source,
                    jobs_found: 0,
                    error: Some(e.to_string()),
                    version,
                });
            }
        }
    }

    fn record_missing(&mut self, name: &str, message: String) {
        self.outcomes.push(SourceOutcome {
            source: name.to_string(),
            jobs_found: 0,
            error: Some(message),
            version: String::new(),
        });
    }
}

struct Entry {
    scraper: Arc<dyn Scraper>,
    settings: SourceSettings,
}

/// Name-keyed set of scrapers, run in registration order
#[derive(Default)]
pub struct ScraperRegistry {
    entries: HashMap<String, Entry>,
    order: Vec<String>,
}

impl ScraperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds one [`SourceScraper`] per configured source
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `config` - Loaded and validated configuration
    /// * `fetcher` - Request executor shared by all sources
    pub fn from_config(config: &Config, fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        let mut registry = Self::new();
        for source in &config.sources {
            let definition = source.resolve()?;
            let settings = SourceSettings {
                enabled: source.enabled,
                rate_limit: definition.rate_limit,
                retry: definition.retry,
            };
            let scraper = SourceScraper::new(definition, Arc::clone(&fetcher))?;
            registry.register(Arc::new(scraper), settings);
        }
        Ok(registry)
    }

    /// Adds a scraper and pushes its settings into it
    ///
    /// Registering a name twice replaces the earlier scraper but keeps its
    /// position in the run order.
    pub fn register(&mut self, scraper: Arc<dyn Scraper>, settings: SourceSettings) {
        let name = scraper.name().to_string();
        scraper.set_rate_limit(settings.rate_limit);
        scraper.set_retry_policy(settings.retry);

        if self
            .entries
            .insert(name.clone(), Entry { scraper, settings })
            .is_some()
        {
            warn!(source = %name, "Replacing already registered scraper");
        } else {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Scraper>> {
        self.entries.get(name).map(|e| Arc::clone(&e.scraper))
    }

    pub fn settings(&self, name: &str) -> Option<SourceSettings> {
        self.entries.get(name).map(|e| e.settings)
    }

    /// Names in registration order
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn enabled(&self) -> Vec<Arc<dyn Scraper>> {
        self.order
            .iter()
            .filter_map(|name| self.entries.get(name))
            .filter(|e| e.settings.enabled)
            .map(|e| Arc::clone(&e.scraper))
            .collect()
    }

    /// Runs every enabled scraper, one after another
    pub async fn scrape_all(&self, options: &ScrapingOptions) -> ScrapeReport {
        let mut report = ScrapeReport::default();
        for scraper in self.enabled() {
            let result = scraper.scrape_jobs(options).await;
            report.record(scraper.as_ref(), result);
        }
        report
    }

    /// Runs the named scrapers, one after another, in the given order
    ///
    /// Unknown names are logged and reported as failed outcomes. Disabled
    /// scrapers run when asked for by name.
    pub async fn scrape_specific(
        &self,
        names: &[String],
        options: &ScrapingOptions,
    ) -> ScrapeReport {
        let mut report = ScrapeReport::default();
        for name in names {
            let Some(scraper) = self.get(name) else {
                warn!(source = %name, "Unknown scraper requested");
                report.record_missing(name, IngestError::UnknownScraper(name.clone()).to_string());
                continue;
            };
            let result = scraper.scrape_jobs(options).await;
            report.record(scraper.as_ref(), result);
        }
        report
    }

    /// Runs every enabled scraper on its own task
    ///
    /// Each source still sends one request at a time through its own rate
    /// limiter. Outcomes are reported in registration order.
    pub async fn scrape_all_concurrent(&self, options: &ScrapingOptions) -> ScrapeReport {
        let handles: Vec<_> = self
            .enabled()
            .into_iter()
            .map(|scraper| {
                let options = options.clone();
                let task_scraper = Arc::clone(&scraper);
                let handle =
                    tokio::spawn(async move { task_scraper.scrape_jobs(&options).await });
                (scraper, handle)
            })
            .collect();

        let mut report = ScrapeReport::default();
        for (scraper, handle) in handles {
            match handle.await {
                Ok(result) => report.record(scraper.as_ref(), result),
                Err(e) => {
                    error!(source = %scraper.name(), error = %e, "Scrape task aborted");
                    report.record_missing(scraper.name(), format!("Scrape task aborted: {}", e));
                }
            }
        }
        report
    }

    /// Checks every registered scraper's health
    ///
    /// A check that panics counts as unhealthy.
    pub async fn check_all_scrapers_health(&self) -> BTreeMap<String, bool> {
        let mut health = BTreeMap::new();
        for name in &self.order {
            let Some(entry) = self.entries.get(name) else {
                continue;
            };
            let scraper = Arc::clone(&entry.scraper);
            let healthy = tokio::spawn(async move { scraper.is_healthy().await })
                .await
                .unwrap_or_else(|e| {
                    warn!(source = %name, error = %e, "Health check panicked");
                    false
                });
            health.insert(name.clone(), healthy);
        }
        health
    }

    /// Merges `patch` over a source's settings and applies it to the scraper
    ///
    /// # Returns
    ///
    /// * `Ok(SourceSettings)` - The settings now in effect
    /// * `Err(IngestError::UnknownScraper)` - No source with that name
    pub fn update_config(&mut self, name: &str, patch: SettingsPatch) -> Result<SourceSettings> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| IngestError::UnknownScraper(name.to_string()))?;

        if let Some(enabled) = patch.enabled {
            entry.settings.enabled = enabled;
        }
        if let Some(rate_limit) = patch.rate_limit {
            entry.settings.rate_limit = rate_limit;
            entry.scraper.set_rate_limit(rate_limit);
        }
        if let Some(retry) = patch.retry {
            entry.settings.retry = retry;
            entry.scraper.set_retry_policy(retry);
        }

        info!(source = %name, enabled = entry.settings.enabled, "Scraper settings updated");
        Ok(entry.settings)
    }

    /// Metrics of every registered scraper, in registration order
    pub fn metrics(&self) -> Vec<(String, ScrapingMetrics)> {
        self.order
            .iter()
            .filter_map(|name| self.entries.get(name))
            .map(|e| (e.scraper.name().to_string(), e.scraper.metrics()))
            .collect()
    }
}
