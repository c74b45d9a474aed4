//! Deduplication engine
//!
//! Gathers candidate postings from the job store with several lookups, scores
//! each candidate and turns the best score into a create / update / skip
//! recommendation. The engine only reads from the store.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::dedup::similarity::score_candidate;
use crate::dedup::{
    DeduplicationBatchStats, DeduplicationDecision, DeduplicationOptions, DeduplicationStats,
    RecommendedAction, SimilarityScore,
};
use crate::models::JobPosting;
use crate::storage::{JobStore, StorageError, StoredJob};
use crate::{IngestError, Result};

fn lookup_failed(e: StorageError) -> IngestError {
    IngestError::DuplicateCheck(e.to_string())
}

/// Checks incoming postings against the postings already stored
pub struct DeduplicationEngine<S: JobStore + ?Sized> {
    store: Arc<S>,
}

impl<S: JobStore + ?Sized> DeduplicationEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Runs every enabled lookup and returns the union of results by id
    fn find_candidates(
        &self,
        posting: &JobPosting,
        options: &DeduplicationOptions,
    ) -> std::result::Result<Vec<StoredJob>, StorageError> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        let mut add = |jobs: Vec<StoredJob>| {
            for job in jobs {
                if seen.insert(job.id) {
                    candidates.push(job);
                }
            }
        };

        if options.check_apply_link && !posting.apply_link.trim().is_empty() {
            add(self
                .store
                .find_by_apply_link(&posting.apply_link)?
                .into_iter()
                .collect());
        }

        if options.check_title_company {
            add(self
                .store
                .find_by_title_company(&posting.title, &posting.company)?);
        }

        if options.check_text_similarity {
            let combined = format!("{} {}", posting.title.trim(), posting.company.trim());
            for query in [posting.title.as_str(), posting.company.as_str(), combined.as_str()] {
                add(self.store.search(query, options.candidate_limit)?);
            }
        }

        if options.check_location && !posting.location.trim().is_empty() {
            add(self
                .store
                .find_by_location(&posting.location, options.candidate_limit)?);
        }

        Ok(candidates)
    }

    /// Decides whether `posting` duplicates a stored posting
    ///
    /// # Arguments
    ///
    /// * `posting` - The incoming posting
    /// * `options` - Enabled checks, weights and thresholds
    ///
    /// # Returns
    ///
    /// * `Ok(DeduplicationDecision)` - The recommendation with scored candidates
    /// * `Err(IngestError::DuplicateCheck)` - A store lookup failed
    pub fn check_for_duplicates(
        &self,
        posting: &JobPosting,
        options: &DeduplicationOptions,
    ) -> Result<DeduplicationDecision> {
        let candidates = self.find_candidates(posting, options).map_err(lookup_failed)?;

        if candidates.is_empty() {
            return Ok(DeduplicationDecision {
                is_duplicate: false,
                confidence: 1.0,
                similar_jobs: Vec::new(),
                recommended_action: RecommendedAction::Create,
                reason: "No similar jobs found".to_string(),
            });
        }

        let mut scores: Vec<SimilarityScore> = candidates
            .iter()
            .map(|c| score_candidate(posting, c.id, &c.posting, options))
            .collect();
        scores.sort_by(|a, b| b.score.total_cmp(&a.score));

        let best = scores[0].score;
        let is_duplicate = best >= options.min_similarity_score;

        let (action, reason) = if !is_duplicate {
            (
                RecommendedAction::Create,
                format!("Closest match is only {:.0}% similar", best * 100.0),
            )
        } else if best >= options.skip_threshold {
            (RecommendedAction::Skip, scores[0].reason.clone())
        } else {
            (RecommendedAction::Update, scores[0].reason.clone())
        };

        debug!(
            title = %posting.title,
            company = %posting.company,
            candidates = scores.len(),
            best_score = best,
            action = %action,
            "Duplicate check finished"
        );

        Ok(DeduplicationDecision {
            is_duplicate,
            confidence: best,
            similar_jobs: scores,
            recommended_action: action,
            reason,
        })
    }

    /// Checks a batch of postings and tallies the recommendations
    ///
    /// A posting whose check fails is logged and counted as skipped.
    pub fn process_batch(
        &self,
        postings: &[JobPosting],
        options: &DeduplicationOptions,
    ) -> DeduplicationBatchStats {
        let started = Instant::now();
        let mut stats = DeduplicationBatchStats::default();
        let mut confidence_sum = 0.0;
        let mut checked = 0usize;

        for posting in postings {
            stats.total_processed += 1;

            let decision = match self.check_for_duplicates(posting, options) {
                Ok(decision) => decision,
                Err(e) => {
                    warn!(
                        title = %posting.title,
                        apply_link = %posting.apply_link,
                        error = %e,
                        "Duplicate check failed"
                    );
                    stats.skipped += 1;
                    continue;
                }
            };

            confidence_sum += decision.confidence;
            checked += 1;
            if decision.is_duplicate {
                stats.duplicates_found += 1;
            }
            match decision.recommended_action {
                RecommendedAction::Create => stats.created += 1,
                RecommendedAction::Update => stats.updated += 1,
                RecommendedAction::Skip => stats.skipped += 1,
            }
        }

        if checked > 0 {
            stats.average_similarity_score = confidence_sum / checked as f64;
        }
        stats.elapsed_ms = (started.elapsed().as_millis() as u64).max(1);
        stats
    }

    /// Summarizes likely duplicates already in the store
    pub fn deduplication_stats(&self) -> Result<DeduplicationStats> {
        let total_jobs = self.store.count()?;
        let groups = self.store.title_company_groups()?;

        Ok(DeduplicationStats {
            total_jobs,
            potential_duplicates: groups.iter().map(|g| g.size.saturating_sub(1)).sum(),
            duplicate_groups: groups.len(),
        })
    }
}
