//! Normalized job posting record
//!
//! Every parser adapter produces [`JobPosting`] values through a
//! [`PostingDraft`], which derives the stable source id and the lower-cased
//! search text. Once built, a posting is never mutated by the core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::parsers::extract::stable_id;

/// Lifecycle status of a posting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Active,
    Inactive,
}

impl JobStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// A normalized job posting
///
/// `apply_link` is the natural identity: two postings with the same link are
/// the same logical posting regardless of which source produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub title: String,
    pub company: String,
    pub location: String,
    pub apply_link: String,
    pub posted_date: DateTime<Utc>,
    pub salary: Option<String>,
    pub tags: Vec<String>,
    pub status: JobStatus,
    pub applied: bool,
    pub applied_at: Option<DateTime<Utc>>,
    /// Name of the source that produced this posting
    pub source: String,
    /// Slug of `"{title}-{company}"`, stable across runs
    pub source_id: String,
    pub date_scraped: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    /// Lower-cased concatenation of the searchable fields
    pub search_text: String,
}

impl JobPosting {
    /// Whether the location advertises remote work
    pub fn is_remote(&self) -> bool {
        crate::dedup::similarity::is_remote_location(&self.location)
    }
}

/// Mutable builder for a [`JobPosting`]
///
/// Adapters fill a draft field by field and call [`PostingDraft::build`] once
/// all values are known.
#[derive(Debug, Clone, Default)]
pub struct PostingDraft {
    pub title: String,
    pub company: String,
    pub location: String,
    pub apply_link: String,
    pub posted_date: Option<DateTime<Utc>>,
    pub salary: Option<String>,
    pub tags: Vec<String>,
    pub source: String,
}

impl PostingDraft {
    /// Creates a draft for the given source
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            ..Default::default()
        }
    }

    /// Finalizes the draft into an immutable posting
    ///
    /// Missing posting dates default to the scrape time.
    pub fn build(self) -> JobPosting {
        let now = Utc::now();
        let source_id = stable_id(&self.title, &self.company);
        let search_text = build_search_text(
            &self.title,
            &self.company,
            &self.location,
            self.salary.as_deref(),
            &self.tags,
        );

        JobPosting {
            title: self.title,
            company: self.company,
            location: self.location,
            apply_link: self.apply_link,
            posted_date: self.posted_date.unwrap_or(now),
            salary: self.salary,
            tags: self.tags,
            status: JobStatus::Active,
            applied: false,
            applied_at: None,
            source: self.source,
            source_id,
            date_scraped: now,
            last_updated: now,
            search_text,
        }
    }
}

/// Builds the lower-cased search text from the searchable fields
pub fn build_search_text(
    title: &str,
    company: &str,
    location: &str,
    salary: Option<&str>,
    tags: &[String],
) -> String {
    let mut parts: Vec<&str> = vec![title, company, location];
    if let Some(salary) = salary {
        parts.push(salary);
    }
    parts.extend(tags.iter().map(String::as_str));

    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
