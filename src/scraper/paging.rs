//! Page loop shared by all source scrapers

use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::models::{DelayRange, JobPosting, ScrapingOptions};
use crate::parsers::JobParser;
use crate::scraper::rate_limiter::RateLimiter;
use crate::scraper::retry::{with_retry, RetryPolicy};
use crate::{IngestError, Result};

/// Placeholder replaced by the page number in listing URLs
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// Everything one paging run needs
pub struct PageLoop<'a> {
    pub source: &'a str,
    /// Listing URL template containing `{page}`
    pub page_url: &'a str,
    pub limiter: &'a RateLimiter,
    pub parser: Arc<dyn JobParser>,
    pub retry: RetryPolicy,
    /// Courtesy delay between consecutive pages
    pub page_delay: DelayRange,
}

/// Builds the URL of one listing page
pub fn page_url(template: &str, page: u32) -> String {
    template.replace(PAGE_PLACEHOLDER, &page.to_string())
}

/// Fetches and parses one page
///
/// # Returns
///
/// * `Ok((jobs, has_next))` - Parsed postings and whether the page links onward
async fn fetch_page(run: &PageLoop<'_>, url: &str) -> Result<(Vec<JobPosting>, bool)> {
    let html = run.limiter.admit(url).await?;
    let jobs = run.parser.parse_jobs(&html)?;
    let has_next = run.parser.has_next_page(&html);
    debug!(
        source = run.source,
        url,
        jobs = jobs.len(),
        reported_page = run.parser.current_page(&html),
        has_next,
        "Fetched listing page"
    );
    Ok((jobs, has_next))
}

/// Walks the listing pages of one source
///
/// The first page is retried with backoff on transient failures and must
/// yield at least one posting, otherwise `NoJobsParsed` is returned. A failure
/// on any later page ends paging and keeps what was collected.
///
/// # Arguments
///
/// * `run` - Source, parser and pacing for this run
/// * `options` - Page and job bounds plus content filters
pub async fn paginate(run: &PageLoop<'_>, options: &ScrapingOptions) -> Result<Vec<JobPosting>> {
    let mut collected: Vec<JobPosting> = Vec::new();
    if options.max_pages == 0 || options.max_jobs == 0 {
        return Ok(collected);
    }

    for page in 1..=options.max_pages {
        let url = page_url(run.page_url, page);

        let (jobs, has_next) = if page == 1 {
            let label = format!("{} page 1", run.source);
            let url = url.as_str();
            let (jobs, has_next) = with_retry(&run.retry, &label, || fetch_page(run, url)).await?;
            if jobs.is_empty() {
                return Err(IngestError::NoJobsParsed {
                    source_name: run.source.to_string(),
                    version: run.parser.version().to_string(),
                });
            }
            (jobs, has_next)
        } else {
            sleep(run.page_delay.sample()).await;
            match fetch_page(run, &url).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(
                        source = run.source,
                        page,
                        error = %e,
                        "Stopping pagination after page error"
                    );
                    break;
                }
            }
        };

        if jobs.is_empty() {
            debug!(source = run.source, page, "Empty page, stopping");
            break;
        }

        collected.extend(jobs.into_iter().filter(|job| options.accepts(job)));
        if collected.len() >= options.max_jobs {
            collected.truncate(options.max_jobs);
            break;
        }
        if !has_next {
            break;
        }
    }

    Ok(collected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RateLimitConfig;
    use crate::parsers::{SelectorParser, SelectorTable};
    use crate::testutil::MockFetcher;
    use url::Url;

    const TEMPLATE: &str = "https://jobs.test/list?page={page}";

    fn listing(titles: &[&str], next: bool) -> String {
        let items: String = titles
            .iter()
            .map(|t| {
                format!(
                    r#"<div class="job"><a href="/{t}"><span class="title">{t}</span></a><span class="company">Acme</span><span class="loc">Berlin</span></div>"#
                )
            })
            .collect();
        let next = if next { r#"<a class="next" href="/more">next</a>"# } else { "" };
        format!("<html><body>{items}{next}</body></html>")
    }

    fn parser() -> Arc<dyn JobParser> {
        let table = SelectorTable {
            link: Some("a".to_string()),
            location: Some(".loc".to_string()),
            next_page: Some("a.next".to_string()),
            ..SelectorTable::new("v1", "div.job", ".title", ".company")
        };
        let base = Url::parse("https://jobs.test").unwrap();
        Arc::new(SelectorParser::new("jobs", base, table).unwrap())
    }

    fn fast_limits() -> RateLimitConfig {
        RateLimitConfig {
            requests_per_minute: 1000,
            delay_between_requests: DelayRange::fixed(0),
            max_concurrent_requests: 1,
        }
    }

    async fn run(
        fetcher: MockFetcher,
        options: ScrapingOptions,
    ) -> (Result<Vec<JobPosting>>, Arc<MockFetcher>) {
        let fetcher = Arc::new(fetcher);
        let limiter = RateLimiter::new("jobs", fast_limits(), fetcher.clone());
        let page_loop = PageLoop {
            source: "jobs",
            page_url: TEMPLATE,
            limiter: &limiter,
            parser: parser(),
            retry: RetryPolicy::default(),
            page_delay: DelayRange::new(1000, 2000),
        };
        (paginate(&page_loop, &options).await, fetcher)
    }

    #[test]
    fn test_page_url() {
        assert_eq!(page_url(TEMPLATE, 3), "https://jobs.test/list?page=3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_no_next_page() {
        let fetcher = MockFetcher::new()
            .page(&page_url(TEMPLATE, 1), &listing(&["a", "b"], true))
            .page(&page_url(TEMPLATE, 2), &listing(&["c"], false));

        let (jobs, fetcher) = run(fetcher, ScrapingOptions::default()).await;
        let titles: Vec<String> = jobs.unwrap().into_iter().map(|j| j.title).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
        assert_eq!(fetcher.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_jobs_truncates() {
        let fetcher = MockFetcher::new()
            .page(&page_url(TEMPLATE, 1), &listing(&["a", "b"], true))
            .page(&page_url(TEMPLATE, 2), &listing(&["c", "d"], true));

        let options = ScrapingOptions {
            max_jobs: 3,
            ..Default::default()
        };
        let (jobs, fetcher) = run(fetcher, options).await;
        assert_eq!(jobs.unwrap().len(), 3);
        assert_eq!(fetcher.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_pages_bounds() {
        let fetcher = MockFetcher::new()
            .page(&page_url(TEMPLATE, 1), &listing(&["a"], true))
            .page(&page_url(TEMPLATE, 2), &listing(&["b"], true))
            .page(&page_url(TEMPLATE, 3), &listing(&["c"], true));

        let options = ScrapingOptions {
            max_pages: 2,
            ..Default::default()
        };
        let (jobs, _) = run(fetcher, options).await;
        assert_eq!(jobs.unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_first_page_is_no_jobs_parsed() {
        let fetcher = MockFetcher::new().page(&page_url(TEMPLATE, 1), "<html><body></body></html>");
        let (jobs, fetcher) = run(fetcher, ScrapingOptions::default()).await;
        assert!(matches!(jobs, Err(IngestError::NoJobsParsed { .. })));
        assert_eq!(fetcher.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_page_retries_transient_errors() {
        let first = page_url(TEMPLATE, 1);
        let fetcher = MockFetcher::new()
            .network_error(&first)
            .page(&first, &listing(&["a"], false));

        let (jobs, fetcher) = run(fetcher, ScrapingOptions::default()).await;
        assert_eq!(jobs.unwrap().len(), 1);
        assert_eq!(fetcher.request_count(&first), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_page_error_keeps_collected() {
        let fetcher = MockFetcher::new()
            .page(&page_url(TEMPLATE, 1), &listing(&["a", "b"], true))
            .status(&page_url(TEMPLATE, 2), 500);

        let (jobs, fetcher) = run(fetcher, ScrapingOptions::default()).await;
        assert_eq!(jobs.unwrap().len(), 2);
        assert_eq!(fetcher.request_count(&page_url(TEMPLATE, 2)), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filters_apply_before_counting() {
        let fetcher = MockFetcher::new()
            .page(&page_url(TEMPLATE, 1), &listing(&["rust-dev", "go-dev"], true))
            .page(&page_url(TEMPLATE, 2), &listing(&["rust-lead", "java-dev"], false));

        let options = ScrapingOptions {
            keywords: vec!["rust".to_string()],
            max_jobs: 2,
            ..Default::default()
        };
        let (jobs, _) = run(fetcher, options).await;
        let titles: Vec<String> = jobs.unwrap().into_iter().map(|j| j.title).collect();
        assert_eq!(titles, vec!["rust-dev", "rust-lead"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_courtesy_delay_between_pages() {
        let fetcher = MockFetcher::new()
            .page(&page_url(TEMPLATE, 1), &listing(&["a"], true))
            .page(&page_url(TEMPLATE, 2), &listing(&["b"], false));

        let start = tokio::time::Instant::now();
        let (jobs, _) = run(fetcher, ScrapingOptions::default()).await;
        assert_eq!(jobs.unwrap().len(), 2);
        assert!(start.elapsed() >= std::time::Duration::from_millis(1000));
    }
}
