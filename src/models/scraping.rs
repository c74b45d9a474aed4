//! Scraping configuration values, options and metrics

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::JobPosting;

/// Inclusive range of milliseconds to draw a random delay from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    #[serde(rename = "min-ms")]
    pub min_ms: u64,
    #[serde(rename = "max-ms")]
    pub max_ms: u64,
}

impl DelayRange {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// A fixed delay (min == max)
    pub fn fixed(ms: u64) -> Self {
        Self::new(ms, ms)
    }

    /// Draws a delay uniformly from `[min, max]`
    ///
    /// An inverted range collapses to `min`.
    pub fn sample(&self) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        let ms = rand::rng().random_range(self.min_ms..=self.max_ms);
        Duration::from_millis(ms)
    }
}

/// Per-source request admission limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests admitted per one-minute window
    #[serde(rename = "requests-per-minute")]
    pub requests_per_minute: u32,

    /// Random delay inserted after every request
    #[serde(rename = "delay-between-requests")]
    pub delay_between_requests: DelayRange,

    /// Advisory only; requests to one source are always serialized
    #[serde(rename = "max-concurrent-requests", default = "default_max_concurrent")]
    pub max_concurrent_requests: u32,
}

fn default_max_concurrent() -> u32 {
    1
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 30,
            delay_between_requests: DelayRange::new(1000, 3000),
            max_concurrent_requests: 1,
        }
    }
}

/// Bounds and content filters for one scrape invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapingOptions {
    pub max_pages: u32,
    pub max_jobs: usize,
    /// At least one keyword must occur in the posting's search text
    pub keywords: Vec<String>,
    /// Case-insensitive substring the location must contain
    pub location: Option<String>,
    pub remote_only: bool,
}

impl Default for ScrapingOptions {
    fn default() -> Self {
        Self {
            max_pages: 5,
            max_jobs: 100,
            keywords: Vec::new(),
            location: None,
            remote_only: false,
        }
    }
}

impl ScrapingOptions {
    /// Returns true if the posting passes every configured content filter
    pub fn accepts(&self, posting: &JobPosting) -> bool {
        if self.remote_only && !posting.is_remote() {
            return false;
        }

        if let Some(location) = &self.location {
            let wanted = location.trim().to_lowercase();
            if !wanted.is_empty() && !posting.location.to_lowercase().contains(&wanted) {
                return false;
            }
        }

        if !self.keywords.is_empty() {
            let matched = self
                .keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .any(|k| posting.search_text.contains(&k));
            if !matched {
                return false;
            }
        }

        true
    }
}

/// Operational counters for one source scraper
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ScrapingMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Running mean of request durations in milliseconds
    pub average_response_time_ms: f64,
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub active_protocol_version: String,
}

impl ScrapingMetrics {
    /// Records one completed request
    pub fn record(&mut self, elapsed: Duration, success: bool) {
        self.total_requests += 1;
        if success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }

        let n = self.total_requests as f64;
        let ms = elapsed.as_secs_f64() * 1000.0;
        self.average_response_time_ms += (ms - self.average_response_time_ms) / n;
    }

    /// Share of requests that succeeded, 1.0 when nothing was sent yet
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 1.0;
        }
        self.successful_requests as f64 / self.total_requests as f64
    }
}
