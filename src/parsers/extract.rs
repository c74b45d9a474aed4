//! Shared extraction helpers used by every parser adapter
//!
//! This module handles the repetitive parts of pulling fields out of HTML:
//! - Text and attribute lookup by selector
//! - Tag list extraction
//! - Resolving relative links against a base URL
//! - Deriving slugs and stable identifiers

use scraper::{ElementRef, Selector};
use url::Url;

/// Collects the text of an element with all whitespace runs collapsed
pub fn element_text(element: &ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Returns the collapsed text of the first descendant matching `selector`
///
/// Empty text is treated as absent.
pub fn text_by_selector(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|el| element_text(&el))
        .filter(|s| !s.is_empty())
}

/// Returns an attribute of the first descendant matching `selector`
pub fn attr_by_selector(
    element: &ElementRef<'_>,
    selector: &Selector,
    attr: &str,
) -> Option<String> {
    element
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Returns the texts of all descendants matching `selector`
///
/// Values are trimmed, empty values dropped, and duplicates removed
/// (case-insensitively) while keeping the first occurrence's position.
pub fn tag_list(element: &ElementRef<'_>, selector: &Selector) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for el in element.select(selector) {
        push_unique_tag(&mut tags, element_text(&el));
    }
    tags
}

/// Appends a tag unless it is empty or already present
pub fn push_unique_tag(tags: &mut Vec<String>, tag: String) {
    if tag.is_empty() {
        return;
    }
    let lower = tag.to_lowercase();
    if !tags.iter().any(|t| t.to_lowercase() == lower) {
        tags.push(tag);
    }
}

/// Resolves a link href to an absolute HTTP(S) URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}

/// Lower-cases a string and replaces every run of non-alphanumeric
/// characters with a single hyphen
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Cross-run identifier of a posting: the slug of `"{title}-{company}"`
pub fn stable_id(title: &str, company: &str) -> String {
    slugify(&format!("{}-{}", title, company))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn base_url() -> Url {
        Url::parse("https://jobs.example.com/board/").unwrap()
    }

    fn sel(s: &str) -> Selector {
        Selector::parse(s).unwrap()
    }

    #[test]
    fn test_text_by_selector_collapses_whitespace() {
        let html = Html::parse_fragment("<div><h2>  Rust \n   Developer </h2></div>");
        let root = html.root_element();
        assert_eq!(
            text_by_selector(&root, &sel("h2")),
            Some("Rust Developer".to_string())
        );
    }

    #[test]
    fn test_text_by_selector_empty_is_none() {
        let html = Html::parse_fragment("<div><h2>   </h2></div>");
        let root = html.root_element();
        assert_eq!(text_by_selector(&root, &sel("h2")), None);
        assert_eq!(text_by_selector(&root, &sel("h3")), None);
    }

    #[test]
    fn test_attr_by_selector() {
        let html = Html::parse_fragment(r#"<div><a href=" /jobs/1 ">Apply</a></div>"#);
        let root = html.root_element();
        assert_eq!(
            attr_by_selector(&root, &sel("a"), "href"),
            Some("/jobs/1".to_string())
        );
        assert_eq!(attr_by_selector(&root, &sel("a"), "title"), None);
    }

    #[test]
    fn test_tag_list_dedups_and_keeps_order() {
        let html = Html::parse_fragment(
            "<ul><li>Rust</li><li> </li><li>Tokio</li><li>rust</li><li>SQL</li></ul>",
        );
        let root = html.root_element();
        assert_eq!(
            tag_list(&root, &sel("li")),
            vec!["Rust".to_string(), "Tokio".to_string(), "SQL".to_string()]
        );
    }

    #[test]
    fn test_resolve_relative_link() {
        assert_eq!(
            resolve_link("/jobs/42", &base_url()),
            Some("https://jobs.example.com/jobs/42".to_string())
        );
        assert_eq!(
            resolve_link("42", &base_url()),
            Some("https://jobs.example.com/board/42".to_string())
        );
    }

    #[test]
    fn test_resolve_absolute_link() {
        assert_eq!(
            resolve_link("https://other.com/apply", &base_url()),
            Some("https://other.com/apply".to_string())
        );
    }

    #[test]
    fn test_resolve_rejects_special_links() {
        assert_eq!(resolve_link("javascript:void(0)", &base_url()), None);
        assert_eq!(resolve_link("mailto:hr@example.com", &base_url()), None);
        assert_eq!(resolve_link("tel:+49123", &base_url()), None);
        assert_eq!(resolve_link("#top", &base_url()), None);
        assert_eq!(resolve_link("", &base_url()), None);
        assert_eq!(resolve_link("ftp://files.example.com/x", &base_url()), None);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Senior Rust Engineer (m/w/d)"), "senior-rust-engineer-m-w-d");
        assert_eq!(slugify("  --Hello,   World!--  "), "hello-world");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn test_stable_id() {
        assert_eq!(
            stable_id("Backend Developer", "Acme Corp."),
            "backend-developer-acme-corp"
        );
    }
}
