//! Arbeitnow (arbeitnow.com) selector tables
//!
//! Arbeitnow shows benefit badges ("Visa sponsorship", "Relocation") next to
//! the skill tags; both end up in the posting's tag list.

use super::SourcePreset;
use crate::parsers::SelectorTable;

pub(super) fn preset() -> SourcePreset {
    SourcePreset {
        name: "arbeitnow",
        base_url: "https://www.arbeitnow.com",
        page_url: "https://www.arbeitnow.com/?page={page}",
        versions: vec![card_layout(), list_layout()],
    }
}

/// Card grid layout
fn card_layout() -> SelectorTable {
    SelectorTable {
        location: Some(".job-location".to_string()),
        link: Some("h2.job-title a".to_string()),
        date: Some("time".to_string()),
        date_attr: Some("datetime".to_string()),
        salary: Some(".salary".to_string()),
        tags: Some(".job-tags .tag".to_string()),
        extra_tags: vec![".benefits .benefit".to_string()],
        next_page: Some("a[rel=\"next\"]".to_string()),
        current_page: Some(".pagination .active".to_string()),
        fingerprints: vec!["div.jobs-container".to_string(), "div.job-card".to_string()],
        ..SelectorTable::new("v2", "div.job-card", "h2.job-title", ".company-name")
    }
}

/// Older single-column list layout
fn list_layout() -> SelectorTable {
    SelectorTable {
        location: Some(".location".to_string()),
        link: Some("a.job-link".to_string()),
        date: Some(".posted-at".to_string()),
        tags: Some(".tags span".to_string()),
        extra_tags: vec![".perks .perk".to_string()],
        next_page: Some("li.next a".to_string()),
        current_page: Some("li.current".to_string()),
        fingerprints: vec!["ul.job-listings".to_string()],
        ..SelectorTable::new("v1", "li.job-listing", ".job-title", ".company")
    }
}
