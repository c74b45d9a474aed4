//! Job-Sift: job-board ingestion with polite scraping and duplicate detection
//!
//! This crate scrapes job postings from several job-board websites, normalizes
//! them into a common [`JobPosting`] shape, and decides for each posting whether
//! it is new, an update of a stored posting, or a duplicate to discard.

pub mod config;
pub mod dedup;
pub mod models;
pub mod parsers;
pub mod pipeline;
pub mod scraper;
pub mod sources;
pub mod storage;

#[cfg(test)]
pub(crate) mod testutil;

use thiserror::Error;

/// Main error type for Job-Sift operations
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP {status} {status_text} for {url}")]
    HttpStatus {
        url: String,
        status: u16,
        status_text: String,
    },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("HTML parse error for {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    #[error("No jobs parsed from first page of {source_name} ({version})")]
    NoJobsParsed {
        source_name: String,
        version: String,
    },

    #[error("All scraper versions failed for {source_name}")]
    AllVersionsFailed { source_name: String },

    #[error("Unknown scraper: {0}")]
    UnknownScraper(String),

    #[error("Rate limiter for {0} is no longer running")]
    LimiterClosed(String),

    #[error("Failed to check duplicates: {0}")]
    DuplicateCheck(String),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// Returns true if the failure is worth retrying with backoff
    ///
    /// Only connection-level problems qualify. HTTP status errors and parse
    /// failures are answered by the version-fallback protocol instead.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => true,
            Self::Client(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),
}

/// Result type alias for Job-Sift operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use dedup::{DeduplicationDecision, DeduplicationEngine, DeduplicationOptions};
pub use models::{JobPosting, PostingDraft, RateLimitConfig, ScrapingMetrics, ScrapingOptions};
pub use scraper::{Scraper, ScraperRegistry, SourceScraper};
