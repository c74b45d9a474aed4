use serde::Deserialize;
use url::Url;

use crate::dedup::DeduplicationOptions;
use crate::models::{DelayRange, RateLimitConfig};
use crate::parsers::SelectorTable;
use crate::scraper::{RetryPolicy, SourceDefinition};
use crate::sources;
use crate::{ConfigError, ConfigResult};

/// Main configuration structure for Job-Sift
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,

    pub storage: StorageConfig,

    #[serde(default)]
    pub dedup: DeduplicationOptions,

    #[serde(rename = "source", default)]
    pub sources: Vec<SourceConfig>,
}

/// Identity and timeouts of the shared HTTP client
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    #[serde(rename = "accept-language")]
    pub accept_language: String,

    /// Whole-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!(
                "Mozilla/5.0 (compatible; JobSift/{})",
                env!("CARGO_PKG_VERSION")
            ),
            accept_language: "en-US,en;q=0.9".to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// Job store location
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// One `[[source]]` entry
///
/// A source either names a built-in `preset` or spells out its URLs and
/// `[[source.version]]` selector tables. Explicit values override the preset.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub preset: Option<String>,

    #[serde(rename = "base-url", default)]
    pub base_url: Option<String>,

    /// Listing URL with a `{page}` placeholder
    #[serde(rename = "page-url", default)]
    pub page_url: Option<String>,

    #[serde(rename = "rate-limit", default)]
    pub rate_limit: Option<RateLimitConfig>,

    #[serde(default)]
    pub retry: Option<RetryPolicy>,

    /// Courtesy delay between listing pages
    #[serde(rename = "page-delay", default)]
    pub page_delay: Option<DelayRange>,

    #[serde(rename = "active-version", default)]
    pub active_version: Option<String>,

    #[serde(rename = "version", default)]
    pub versions: Vec<SelectorTable>,
}

fn default_enabled() -> bool {
    true
}

/// Courtesy delay used when a source sets none
pub fn default_page_delay() -> DelayRange {
    DelayRange::new(2000, 5000)
}

impl SourceConfig {
    /// Merges this entry with its preset into a [`SourceDefinition`]
    ///
    /// # Returns
    ///
    /// * `Ok(SourceDefinition)` - URLs, versions and pacing of the source
    /// * `Err(ConfigError)` - Unknown preset, missing URLs or versions, or a
    ///   malformed base URL
    pub fn resolve(&self) -> ConfigResult<SourceDefinition> {
        let preset = self.preset.as_deref().map(sources::preset).transpose()?;

        let base_url = self
            .base_url
            .clone()
            .or_else(|| preset.as_ref().map(|p| p.base_url.to_string()))
            .ok_or_else(|| {
                ConfigError::Validation(format!("Source '{}' has no base-url", self.name))
            })?;
        let base_url = Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid base-url for '{}': {}", self.name, e))
        })?;

        let page_url = self
            .page_url
            .clone()
            .or_else(|| preset.as_ref().map(|p| p.page_url.to_string()))
            .ok_or_else(|| {
                ConfigError::Validation(format!("Source '{}' has no page-url", self.name))
            })?;

        let versions = if self.versions.is_empty() {
            preset.map(|p| p.versions).unwrap_or_default()
        } else {
            self.versions.clone()
        };
        if versions.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Source '{}' defines no selector versions",
                self.name
            )));
        }

        Ok(SourceDefinition {
            name: self.name.clone(),
            base_url,
            page_url,
            versions,
            active_version: self.active_version.clone(),
            rate_limit: self.rate_limit.unwrap_or_default(),
            retry: self.retry.unwrap_or_default(),
            page_delay: self.page_delay.unwrap_or_else(default_page_delay),
        })
    }
}
