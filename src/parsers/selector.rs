//! Selector-table driven parser adapter
//!
//! Each protocol version of a source is described by a [`SelectorTable`]:
//! which element wraps one posting, and where inside it each field lives.
//! Site quirks are table entries too, e.g. extra benefit badges that become
//! tags, or a location split across several elements.

use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use url::Url;

use crate::models::{JobPosting, PostingDraft};
use crate::parsers::date::parse_flexible_date;
use crate::parsers::extract::{
    attr_by_selector, push_unique_tag, resolve_link, stable_id, tag_list, text_by_selector,
};
use crate::parsers::JobParser;
use crate::{ConfigError, Result};

/// Selector table for one layout version of a source
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SelectorTable {
    /// Version identifier, unique per source
    pub id: String,

    /// Element wrapping a single posting
    pub item: String,

    pub title: String,

    pub company: String,

    #[serde(default)]
    pub location: Option<String>,

    /// Elements whose texts are joined with ", " to form the location
    #[serde(rename = "location-parts", default)]
    pub location_parts: Vec<String>,

    /// Element carrying the apply link; the item itself when it is an anchor
    #[serde(default)]
    pub link: Option<String>,

    #[serde(rename = "link-attr", default = "default_link_attr")]
    pub link_attr: String,

    #[serde(default)]
    pub date: Option<String>,

    /// Attribute holding a machine-readable date, preferred over the text
    #[serde(rename = "date-attr", default)]
    pub date_attr: Option<String>,

    #[serde(default)]
    pub salary: Option<String>,

    #[serde(default)]
    pub tags: Option<String>,

    /// Additional badge selectors appended to the tag list
    #[serde(rename = "extra-tags", default)]
    pub extra_tags: Vec<String>,

    #[serde(rename = "next-page", default)]
    pub next_page: Option<String>,

    #[serde(rename = "current-page", default)]
    pub current_page: Option<String>,

    /// Selectors whose presence identifies this layout
    #[serde(default)]
    pub fingerprints: Vec<String>,
}

fn default_link_attr() -> String {
    "href".to_string()
}

impl SelectorTable {
    /// Creates a table with only the required selectors set
    pub fn new(id: &str, item: &str, title: &str, company: &str) -> Self {
        Self {
            id: id.to_string(),
            item: item.to_string(),
            title: title.to_string(),
            company: company.to_string(),
            location: None,
            location_parts: Vec::new(),
            link: None,
            link_attr: default_link_attr(),
            date: None,
            date_attr: None,
            salary: None,
            tags: None,
            extra_tags: Vec::new(),
            next_page: None,
            current_page: None,
            fingerprints: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct CompiledTable {
    item: Selector,
    title: Selector,
    company: Selector,
    location: Option<Selector>,
    location_parts: Vec<Selector>,
    link: Option<Selector>,
    date: Option<Selector>,
    salary: Option<Selector>,
    tags: Option<Selector>,
    extra_tags: Vec<Selector>,
    next_page: Option<Selector>,
    current_page: Option<Selector>,
    fingerprints: Vec<Selector>,
}

/// A [`JobParser`] compiled from a [`SelectorTable`]
#[derive(Debug)]
pub struct SelectorParser {
    source: String,
    base_url: Url,
    table: SelectorTable,
    compiled: CompiledTable,
}

impl SelectorParser {
    /// Compiles a selector table for the given source
    ///
    /// # Returns
    ///
    /// * `Ok(SelectorParser)` - All selectors compiled
    /// * `Err(ConfigError::InvalidSelector)` - A selector is not valid CSS
    pub fn new(source: &str, base_url: Url, table: SelectorTable) -> Result<Self> {
        let compiled = CompiledTable {
            item: compile(&table.item)?,
            title: compile(&table.title)?,
            company: compile(&table.company)?,
            location: compile_opt(&table.location)?,
            location_parts: compile_all(&table.location_parts)?,
            link: compile_opt(&table.link)?,
            date: compile_opt(&table.date)?,
            salary: compile_opt(&table.salary)?,
            tags: compile_opt(&table.tags)?,
            extra_tags: compile_all(&table.extra_tags)?,
            next_page: compile_opt(&table.next_page)?,
            current_page: compile_opt(&table.current_page)?,
            fingerprints: compile_all(&table.fingerprints)?,
        };

        Ok(Self {
            source: source.to_string(),
            base_url,
            table,
            compiled,
        })
    }

    pub fn table(&self) -> &SelectorTable {
        &self.table
    }

    /// Extracts one posting, or None when a required field is missing
    fn parse_item(&self, item: &ElementRef<'_>, index: usize) -> Option<JobPosting> {
        let c = &self.compiled;

        let title = text_by_selector(item, &c.title).unwrap_or_default();
        let company = text_by_selector(item, &c.company).unwrap_or_default();
        if title.is_empty() || company.is_empty() {
            tracing::warn!(
                source = %self.source,
                version = %self.table.id,
                index,
                "Dropping item with missing {}",
                if title.is_empty() { "title" } else { "company" }
            );
            return None;
        }

        let mut draft = PostingDraft::new(&self.source);
        draft.location = self.extract_location(item);
        draft.apply_link = self.extract_link(item).unwrap_or_else(|| {
            let mut fallback = self.base_url.clone();
            fallback.set_fragment(Some(&stable_id(&title, &company)));
            fallback.to_string()
        });
        draft.posted_date = Some(parse_flexible_date(self.extract_date(item).as_deref()));
        draft.salary = c.salary.as_ref().and_then(|s| text_by_selector(item, s));

        let mut tags = c
            .tags
            .as_ref()
            .map(|s| tag_list(item, s))
            .unwrap_or_default();
        for selector in &c.extra_tags {
            for tag in tag_list(item, selector) {
                push_unique_tag(&mut tags, tag);
            }
        }
        draft.tags = tags;
        draft.title = title;
        draft.company = company;

        Some(draft.build())
    }

    fn extract_location(&self, item: &ElementRef<'_>) -> String {
        let c = &self.compiled;
        if !c.location_parts.is_empty() {
            let parts: Vec<String> = c
                .location_parts
                .iter()
                .filter_map(|s| text_by_selector(item, s))
                .collect();
            if !parts.is_empty() {
                return parts.join(", ");
            }
        }
        c.location
            .as_ref()
            .and_then(|s| text_by_selector(item, s))
            .unwrap_or_default()
    }

    fn extract_link(&self, item: &ElementRef<'_>) -> Option<String> {
        let attr = self.table.link_attr.as_str();
        let href = match &self.compiled.link {
            Some(selector) => attr_by_selector(item, selector, attr),
            None => item.value().attr(attr).map(|v| v.trim().to_string()),
        }?;
        resolve_link(&href, &self.base_url)
    }

    fn extract_date(&self, item: &ElementRef<'_>) -> Option<String> {
        let selector = self.compiled.date.as_ref()?;
        if let Some(attr) = &self.table.date_attr {
            if let Some(value) = attr_by_selector(item, selector, attr) {
                return Some(value);
            }
        }
        text_by_selector(item, selector)
    }
}

impl JobParser for SelectorParser {
    fn version(&self) -> &str {
        &self.table.id
    }

    fn parse_jobs(&self, html: &str) -> Result<Vec<JobPosting>> {
        let document = Html::parse_document(html);
        let jobs: Vec<JobPosting> = document
            .select(&self.compiled.item)
            .enumerate()
            .filter_map(|(index, item)| self.parse_item(&item, index))
            .collect();

        tracing::debug!(
            source = %self.source,
            version = %self.table.id,
            "Parsed {} jobs",
            jobs.len()
        );
        Ok(jobs)
    }

    fn has_next_page(&self, html: &str) -> bool {
        let Some(selector) = &self.compiled.next_page else {
            return true;
        };
        let document = Html::parse_document(html);
        let result = document.select(selector).any(|el| {
            let value = el.value();
            let disabled = value.attr("disabled").is_some()
                || value.attr("aria-disabled") == Some("true")
                || value.classes().any(|c| c == "disabled");
            !disabled
        });
        result
    }

    fn current_page(&self, html: &str) -> u32 {
        let Some(selector) = &self.compiled.current_page else {
            return 1;
        };
        let document = Html::parse_document(html);
        let page = document
            .select(selector)
            .next()
            .map(|el| el.text().collect::<String>())
            .and_then(|text| text.trim().parse::<u32>().ok())
            .filter(|page| *page > 0)
            .unwrap_or(1);
        page
    }

    fn matches_layout(&self, html: &str) -> bool {
        let document = Html::parse_document(html);
        let fingerprints = if self.compiled.fingerprints.is_empty() {
            std::slice::from_ref(&self.compiled.item)
        } else {
            self.compiled.fingerprints.as_slice()
        };
        let result = fingerprints
            .iter()
            .any(|selector| document.select(selector).next().is_some());
        result
    }
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| {
        ConfigError::InvalidSelector {
            selector: selector.to_string(),
            message: format!("{:?}", e),
        }
        .into()
    })
}

fn compile_opt(selector: &Option<String>) -> Result<Option<Selector>> {
    selector.as_deref().map(compile).transpose()
}

fn compile_all(selectors: &[String]) -> Result<Vec<Selector>> {
    selectors.iter().map(|s| compile(s)).collect()
}
