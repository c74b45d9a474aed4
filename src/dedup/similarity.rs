//! Similarity measures between postings
//!
//! All scores are in `[0, 1]` and comparisons ignore case.

use std::collections::{BTreeSet, HashSet};

use crate::dedup::{DeduplicationOptions, MatchField, SimilarityScore};
use crate::models::JobPosting;

/// Score for an identical (title, company) pair with different links
pub const SAME_TITLE_COMPANY_SCORE: f64 = 0.95;

const REMOTE_MARKERS: &[&str] = &["remote", "anywhere", "worldwide", "work from home"];

/// Compares two strings
///
/// Identical strings score 1.0, containment 0.9, otherwise the share of
/// whitespace tokens they have in common relative to the longer token list.
/// An empty side scores 0.
pub fn string_similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    if a.contains(&b) || b.contains(&a) {
        return 0.9;
    }

    let tokens_a: HashSet<&str> = a.split_whitespace().collect();
    let tokens_b: HashSet<&str> = b.split_whitespace().collect();
    let longest = tokens_a.len().max(tokens_b.len());
    if longest == 0 {
        return 0.0;
    }

    tokens_a.intersection(&tokens_b).count() as f64 / longest as f64
}

/// Whether a location string advertises remote work
pub fn is_remote_location(location: &str) -> bool {
    let location = location.to_lowercase();
    REMOTE_MARKERS.iter().any(|m| location.contains(m))
}

fn location_tokens(location: &str) -> HashSet<String> {
    location
        .to_lowercase()
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Compares two locations
pub fn location_similarity(a: &str, b: &str) -> f64 {
    let (a, b) = (a.trim(), b.trim());
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a.to_lowercase() == b.to_lowercase() {
        return 1.0;
    }

    match (is_remote_location(a), is_remote_location(b)) {
        (true, true) => return 0.9,
        (true, false) | (false, true) => return 0.3,
        (false, false) => {}
    }

    if location_tokens(a).is_disjoint(&location_tokens(b)) {
        0.1
    } else {
        0.7
    }
}

fn same_text(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    !a.is_empty() && a.to_lowercase() == b.to_lowercase()
}

fn describe(fields: &BTreeSet<MatchField>) -> String {
    fields
        .iter()
        .map(MatchField::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Scores a stored posting against an incoming one
///
/// # Arguments
///
/// * `incoming` - The posting being checked
/// * `stored_id` - Store id of the existing posting
/// * `stored` - The existing posting
/// * `options` - Enabled checks and weights
pub fn score_candidate(
    incoming: &JobPosting,
    stored_id: i64,
    stored: &JobPosting,
    options: &DeduplicationOptions,
) -> SimilarityScore {
    let mut matched = BTreeSet::new();
    let same_link = same_text(&incoming.apply_link, &stored.apply_link);
    if same_link {
        matched.insert(MatchField::ApplyLink);
    }
    if same_text(&incoming.title, &stored.title) {
        matched.insert(MatchField::Title);
    }
    if same_text(&incoming.company, &stored.company) {
        matched.insert(MatchField::Company);
    }
    if same_text(&incoming.location, &stored.location) {
        matched.insert(MatchField::Location);
    }

    if options.check_apply_link && same_link {
        return SimilarityScore {
            candidate_id: stored_id,
            score: 1.0,
            matched_fields: matched,
            reason: "Identical apply link".to_string(),
        };
    }

    if options.check_title_company
        && matched.contains(&MatchField::Title)
        && matched.contains(&MatchField::Company)
    {
        return SimilarityScore {
            candidate_id: stored_id,
            score: SAME_TITLE_COMPANY_SCORE,
            matched_fields: matched,
            reason: "Same title and company".to_string(),
        };
    }

    let w = &options.weights;
    let mut weighted = 0.0;
    let mut total = 0.0;

    if options.check_apply_link {
        weighted += w.apply_link * if same_link { 1.0 } else { 0.0 };
        total += w.apply_link;
    }
    if options.check_title_company {
        weighted += w.title * string_similarity(&incoming.title, &stored.title);
        weighted += w.company * string_similarity(&incoming.company, &stored.company);
        total += w.title + w.company;
    }
    if options.check_location {
        weighted += w.location * location_similarity(&incoming.location, &stored.location);
        total += w.location;
    }

    let score = if total > 0.0 {
        (weighted / total).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let reason = if matched.is_empty() {
        format!("{:.0}% similar", score * 100.0)
    } else {
        format!("{:.0}% similar, matched on {}", score * 100.0, describe(&matched))
    };

    SimilarityScore {
        candidate_id: stored_id,
        score,
        matched_fields: matched,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PostingDraft;

    fn posting(title: &str, company: &str, location: &str, link: &str) -> JobPosting {
        PostingDraft {
            title: title.to_string(),
            company: company.to_string(),
            location: location.to_string(),
            apply_link: link.to_string(),
            ..PostingDraft::new("test")
        }
        .build()
    }

    #[test]
    fn test_string_similarity_cases() {
        assert_eq!(string_similarity("Rust Engineer", "rust engineer"), 1.0);
        assert_eq!(string_similarity("Senior Rust Engineer", "Rust Engineer"), 0.9);
        assert_eq!(string_similarity("Rust Engineer", ""), 0.0);
        assert_eq!(string_similarity("", ""), 0.0);
        let partial = string_similarity("Backend Rust Engineer", "Rust Developer");
        assert!((partial - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(string_similarity("Designer", "Accountant"), 0.0);
    }

    #[test]
    fn test_string_similarity_is_symmetric() {
        let pairs = [
            ("Senior Rust Engineer", "Rust Engineer"),
            ("Backend Rust Engineer", "Rust Developer"),
            ("Data Scientist", "Scientist of Data"),
            ("A", ""),
        ];
        for (a, b) in pairs {
            assert_eq!(string_similarity(a, b), string_similarity(b, a));
        }
    }

    #[test]
    fn test_location_similarity_cases() {
        assert_eq!(location_similarity("Remote", "remote"), 1.0);
        assert_eq!(location_similarity("Remote (EU)", "Anywhere"), 0.9);
        assert_eq!(location_similarity("Remote", "Berlin"), 0.3);
        assert_eq!(location_similarity("Berlin", "Berlin, Germany"), 0.7);
        assert_eq!(location_similarity("Berlin", "Munich"), 0.1);
        assert_eq!(location_similarity("", "Munich"), 0.0);
    }

    #[test]
    fn test_remote_detection() {
        assert!(is_remote_location("Fully REMOTE"));
        assert!(is_remote_location("Worldwide"));
        assert!(!is_remote_location("Berlin"));
    }

    #[test]
    fn test_identical_link_scores_one() {
        let a = posting("Rust Engineer", "Acme", "Berlin", "https://a.test/1");
        let b = posting("Totally Different", "Other", "Paris", "https://a.test/1");
        let score = score_candidate(&a, 1, &b, &DeduplicationOptions::default());
        assert_eq!(score.score, 1.0);
        assert!(score.matched_fields.contains(&MatchField::ApplyLink));
    }

    #[test]
    fn test_identical_title_company_scores_095() {
        let a = posting("Rust Engineer", "Acme", "Berlin", "https://a.test/1");
        let b = posting(" rust engineer ", "ACME", "Paris", "https://b.test/9");
        let score = score_candidate(&a, 1, &b, &DeduplicationOptions::default());
        assert_eq!(score.score, SAME_TITLE_COMPANY_SCORE);
        assert_eq!(score.reason, "Same title and company");
    }

    #[test]
    fn test_blended_score() {
        let a = posting("Senior Rust Engineer", "Acme", "Berlin", "https://a.test/1");
        let b = posting("Rust Engineer", "Acme", "Berlin, Germany", "https://b.test/1");
        let score = score_candidate(&a, 1, &b, &DeduplicationOptions::default());
        // (0.4*0 + 0.3*0.9 + 0.2*1 + 0.1*0.7) / 1.0
        assert!((score.score - 0.54).abs() < 1e-9);
        assert_eq!(score.matched_fields, BTreeSet::from([MatchField::Company]));
        assert_eq!(score.reason, "54% similar, matched on company");
    }

    #[test]
    fn test_blend_over_enabled_checks_only() {
        let options = DeduplicationOptions {
            check_apply_link: false,
            ..Default::default()
        };
        let a = posting("Senior Rust Engineer", "Acme", "Berlin", "https://a.test/1");
        let b = posting("Rust Engineer", "Acme", "Berlin, Germany", "https://b.test/1");
        let score = score_candidate(&a, 1, &b, &options);
        assert!((score.score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_no_checks_enabled_scores_zero() {
        let options = DeduplicationOptions {
            check_apply_link: false,
            check_title_company: false,
            check_location: false,
            ..Default::default()
        };
        let a = posting("Rust Engineer", "Acme", "Berlin", "https://a.test/1");
        let score = score_candidate(&a, 1, &a.clone(), &options);
        assert_eq!(score.score, 0.0);
    }

    #[test]
    fn test_scores_stay_in_unit_interval() {
        let options = DeduplicationOptions {
            weights: crate::dedup::SimilarityWeights {
                apply_link: 5.0,
                title: 0.0,
                company: 3.0,
                location: 1.0,
            },
            ..Default::default()
        };
        let samples = [
            posting("Rust Engineer", "Acme", "Berlin", "https://a.test/1"),
            posting("Go Engineer", "Acme", "Remote", "https://a.test/2"),
            posting("", "", "", ""),
            posting("Designer", "Studio", "Paris, France", "https://c.test/3"),
        ];
        for a in &samples {
            for b in &samples {
                let s = score_candidate(a, 1, b, &options).score;
                assert!((0.0..=1.0).contains(&s), "score {} out of range", s);
            }
        }
    }
}
