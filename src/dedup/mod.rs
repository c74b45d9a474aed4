//! Duplicate detection for incoming postings
//!
//! This module contains:
//! - Options, weights and thresholds for the similarity policy
//! - The decision and statistics types the engine produces
//! - String and location similarity (`similarity`)
//! - The [`DeduplicationEngine`] that queries the job store (`engine`)

mod engine;
pub mod similarity;

pub use engine::DeduplicationEngine;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Weight of each field in the blended similarity score
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct SimilarityWeights {
    #[serde(rename = "apply-link", default = "default_apply_link_weight")]
    pub apply_link: f64,
    #[serde(default = "default_title_weight")]
    pub title: f64,
    #[serde(default = "default_company_weight")]
    pub company: f64,
    #[serde(default = "default_location_weight")]
    pub location: f64,
}

fn default_apply_link_weight() -> f64 {
    0.4
}

fn default_title_weight() -> f64 {
    0.3
}

fn default_company_weight() -> f64 {
    0.2
}

fn default_location_weight() -> f64 {
    0.1
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            apply_link: default_apply_link_weight(),
            title: default_title_weight(),
            company: default_company_weight(),
            location: default_location_weight(),
        }
    }
}

/// Which checks run, and how a best score turns into an action
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DeduplicationOptions {
    /// Look up by apply link and weigh link equality
    #[serde(rename = "check-apply-link")]
    pub check_apply_link: bool,

    /// Look up by exact title and company and weigh their similarity
    #[serde(rename = "check-title-company")]
    pub check_title_company: bool,

    /// Query the store's free-text search with title and company
    #[serde(rename = "check-text-similarity")]
    pub check_text_similarity: bool,

    /// Look up by location and weigh location similarity
    #[serde(rename = "check-location")]
    pub check_location: bool,

    /// Best score at or above which a posting counts as a duplicate
    #[serde(rename = "min-similarity-score")]
    pub min_similarity_score: f64,

    /// Best score at or above which a duplicate is skipped instead of updated
    #[serde(rename = "skip-threshold")]
    pub skip_threshold: f64,

    /// Maximum results taken from each fuzzy lookup
    #[serde(rename = "candidate-limit")]
    pub candidate_limit: usize,

    pub weights: SimilarityWeights,
}

impl Default for DeduplicationOptions {
    fn default() -> Self {
        Self {
            check_apply_link: true,
            check_title_company: true,
            check_text_similarity: true,
            check_location: true,
            min_similarity_score: 0.8,
            skip_threshold: 0.95,
            candidate_limit: 20,
            weights: SimilarityWeights::default(),
        }
    }
}

/// A field that matched exactly between candidate and stored posting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    ApplyLink,
    Title,
    Company,
    Location,
}

impl MatchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApplyLink => "apply_link",
            Self::Title => "title",
            Self::Company => "company",
            Self::Location => "location",
        }
    }
}

impl fmt::Display for MatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How one stored posting compares to the candidate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityScore {
    pub candidate_id: i64,
    /// Always within `[0, 1]`
    pub score: f64,
    pub matched_fields: BTreeSet<MatchField>,
    pub reason: String,
}

/// What to do with an incoming posting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendedAction {
    Create,
    Update,
    Skip,
}

impl fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Skip => "skip",
        })
    }
}

/// Outcome of checking one posting against the store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeduplicationDecision {
    pub is_duplicate: bool,
    pub confidence: f64,
    /// Sorted by descending score
    pub similar_jobs: Vec<SimilarityScore>,
    pub recommended_action: RecommendedAction,
    pub reason: String,
}

impl DeduplicationDecision {
    /// The highest-scoring stored posting, if any
    pub fn best_match(&self) -> Option<&SimilarityScore> {
        self.similar_jobs.first()
    }
}

/// Counters for one [`DeduplicationEngine::process_batch`] call
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeduplicationBatchStats {
    pub total_processed: usize,
    pub duplicates_found: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    /// Mean confidence over postings whose check succeeded
    pub average_similarity_score: f64,
    pub elapsed_ms: u64,
}

/// Duplicate groups already present in the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeduplicationStats {
    pub total_jobs: usize,
    /// Rows that would disappear if every group collapsed to one
    pub potential_duplicates: usize,
    pub duplicate_groups: usize,
}
