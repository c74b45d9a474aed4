//! Relocate.me selector tables
//!
//! Relocate lists city/region and country in separate elements; they are
//! joined into one location string.

use super::SourcePreset;
use crate::parsers::SelectorTable;

pub(super) fn preset() -> SourcePreset {
    SourcePreset {
        name: "relocate",
        base_url: "https://relocate.me",
        page_url: "https://relocate.me/search?page={page}",
        versions: vec![post_layout(), vacancy_layout()],
    }
}

fn post_layout() -> SelectorTable {
    SelectorTable {
        location: Some(".job-post__location".to_string()),
        location_parts: vec![
            ".job-post__region".to_string(),
            ".job-post__country".to_string(),
        ],
        link: Some("a.job-post__link".to_string()),
        date: Some(".job-post__date".to_string()),
        salary: Some(".job-post__salary".to_string()),
        tags: Some(".job-post__skills li".to_string()),
        next_page: Some("a.pagination__next".to_string()),
        current_page: Some(".pagination__current".to_string()),
        fingerprints: vec!["section.job-posts".to_string()],
        ..SelectorTable::new(
            "v2",
            "article.job-post",
            ".job-post__title",
            ".job-post__company",
        )
    }
}

fn vacancy_layout() -> SelectorTable {
    SelectorTable {
        location_parts: vec![".vacancy-city".to_string(), ".vacancy-country".to_string()],
        link: Some("a".to_string()),
        date: Some(".vacancy-date".to_string()),
        tags: Some(".vacancy-tags a".to_string()),
        next_page: Some(".pager .next a".to_string()),
        fingerprints: vec!["div.vacancies-list".to_string()],
        ..SelectorTable::new("v1", "div.vacancy", ".vacancy-title", ".vacancy-company")
    }
}
