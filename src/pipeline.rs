//! Scrape-to-store ingestion
//!
//! Runs each scraped posting through the duplicate check and applies the
//! recommendation to the job store. Creates go through the store's
//! apply-link upsert, so two racing creates of the same link still end up as
//! one row.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::dedup::{DeduplicationEngine, DeduplicationOptions, RecommendedAction};
use crate::models::JobPosting;
use crate::storage::{JobStore, UpsertOutcome};
use crate::{IngestError, Result};

/// Counters for one [`ingest`] call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Applies one posting and returns the action taken
fn ingest_one<S: JobStore + ?Sized>(
    engine: &DeduplicationEngine<S>,
    posting: &JobPosting,
    options: &DeduplicationOptions,
) -> Result<RecommendedAction> {
    let decision = engine.check_for_duplicates(posting, options)?;
    let store = engine.store();

    match decision.recommended_action {
        RecommendedAction::Create => match store.upsert(posting)? {
            UpsertOutcome::Inserted(_) => Ok(RecommendedAction::Create),
            UpsertOutcome::Updated(id) => {
                debug!(id, apply_link = %posting.apply_link, "Create collapsed into existing row");
                Ok(RecommendedAction::Update)
            }
        },
        RecommendedAction::Update => {
            let best = decision.best_match().ok_or_else(|| {
                IngestError::DuplicateCheck("update recommended without a match".to_string())
            })?;
            store.update(best.candidate_id, posting)?;
            Ok(RecommendedAction::Update)
        }
        RecommendedAction::Skip => Ok(RecommendedAction::Skip),
    }
}

/// Deduplicates and stores scraped postings
///
/// A posting that fails its check or its write is logged and counted as
/// failed; the rest of the batch continues.
///
/// # Arguments
///
/// * `postings` - Postings in scrape order
/// * `engine` - Engine over the store the postings are written to
/// * `options` - Duplicate policy
pub fn ingest<S: JobStore + ?Sized>(
    postings: &[JobPosting],
    engine: &DeduplicationEngine<S>,
    options: &DeduplicationOptions,
) -> IngestSummary {
    let mut summary = IngestSummary::default();

    for posting in postings {
        summary.total += 1;
        match ingest_one(engine, posting, options) {
            Ok(RecommendedAction::Create) => summary.created += 1,
            Ok(RecommendedAction::Update) => summary.updated += 1,
            Ok(RecommendedAction::Skip) => summary.skipped += 1,
            Err(e) => {
                warn!(
                    title = %posting.title,
                    apply_link = %posting.apply_link,
                    error = %e,
                    "Failed to ingest posting"
                );
                summary.failed += 1;
            }
        }
    }

    info!(
        total = summary.total,
        created = summary.created,
        updated = summary.updated,
        skipped = summary.skipped,
        failed = summary.failed,
        "Ingest finished"
    );
    summary
}
