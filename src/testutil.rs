//! Test doubles for the fetcher and store seams
//!
//! Mocks keep their state behind `Mutex` so tests can assert on recorded
//! calls after handing the mock to the code under test.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::JobPosting;
use crate::scraper::fetcher::PageFetcher;
use crate::storage::{
    JobStore, MemoryJobStore, StorageError, StorageResult, StoredJob, TitleCompanyGroup,
    UpsertOutcome,
};
use crate::{IngestError, Result};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum MockResponse {
    Body(String),
    Status(u16),
    Network,
}

/// Fetcher that answers from per-URL response queues
///
/// Each call pops the next queued response for the URL; the last one is
/// repeated once the queue is down to a single entry. Unknown URLs get a 404.
#[derive(Debug, Default)]
pub struct MockFetcher {
    routes: Mutex<HashMap<String, VecDeque<MockResponse>>>,
    requests: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, url: &str, response: MockResponse) -> Self {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
        self
    }

    /// Queues a 200 response with `body`
    pub fn page(self, url: &str, body: &str) -> Self {
        self.push(url, MockResponse::Body(body.to_string()))
    }

    /// Queues a non-2xx response
    pub fn status(self, url: &str, status: u16) -> Self {
        self.push(url, MockResponse::Status(status))
    }

    /// Queues a connection failure
    pub fn network_error(self, url: &str) -> Self {
        self.push(url, MockResponse::Network)
    }

    /// Every URL fetched so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.requests.lock().unwrap().push(url.to_string());

        let response = {
            let mut routes = self.routes.lock().unwrap();
            match routes.get_mut(url) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match response {
            Some(MockResponse::Body(body)) => Ok(body),
            Some(MockResponse::Status(status)) => Err(IngestError::HttpStatus {
                url: url.to_string(),
                status,
                status_text: "Mock Status".to_string(),
            }),
            Some(MockResponse::Network) => Err(IngestError::Network {
                url: url.to_string(),
                message: "Connection refused".to_string(),
            }),
            None => Err(IngestError::HttpStatus {
                url: url.to_string(),
                status: 404,
                status_text: "Not Found".to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// FlakyStore
// ---------------------------------------------------------------------------

/// Memory store whose lookups fail when their input contains a trigger word
pub struct FlakyStore {
    inner: MemoryJobStore,
    trigger: String,
}

impl FlakyStore {
    pub fn failing_on(trigger: &str) -> Self {
        Self {
            inner: MemoryJobStore::new(),
            trigger: trigger.to_string(),
        }
    }

    pub fn inner(&self) -> &MemoryJobStore {
        &self.inner
    }

    fn check(&self, input: &str) -> StorageResult<()> {
        if input.contains(&self.trigger) {
            Err(StorageError::Database(format!("lookup failed for '{}'", input)))
        } else {
            Ok(())
        }
    }
}

impl JobStore for FlakyStore {
    fn find_by_apply_link(&self, apply_link: &str) -> StorageResult<Option<StoredJob>> {
        self.check(apply_link)?;
        self.inner.find_by_apply_link(apply_link)
    }

    fn find_by_title_company(&self, title: &str, company: &str) -> StorageResult<Vec<StoredJob>> {
        self.check(title)?;
        self.check(company)?;
        self.inner.find_by_title_company(title, company)
    }

    fn search(&self, query: &str, limit: usize) -> StorageResult<Vec<StoredJob>> {
        self.check(query)?;
        self.inner.search(query, limit)
    }

    fn find_by_location(&self, location: &str, limit: usize) -> StorageResult<Vec<StoredJob>> {
        self.check(location)?;
        self.inner.find_by_location(location, limit)
    }

    fn insert(&self, posting: &JobPosting) -> StorageResult<i64> {
        self.check(&posting.title)?;
        self.inner.insert(posting)
    }

    fn update(&self, id: i64, posting: &JobPosting) -> StorageResult<()> {
        self.check(&posting.title)?;
        self.inner.update(id, posting)
    }

    fn upsert(&self, posting: &JobPosting) -> StorageResult<UpsertOutcome> {
        self.check(&posting.title)?;
        self.inner.upsert(posting)
    }

    fn count(&self) -> StorageResult<usize> {
        self.inner.count()
    }

    fn title_company_groups(&self) -> StorageResult<Vec<TitleCompanyGroup>> {
        self.inner.title_company_groups()
    }
}
