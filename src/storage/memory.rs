//! In-memory job store
//!
//! Backs `--dry-run` and tests. Behaves like the SQLite store, including the
//! unique apply link.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use crate::models::JobPosting;
use crate::storage::traits::{JobStore, StorageError, StorageResult};
use crate::storage::{group_key, StoredJob, TitleCompanyGroup, UpsertOutcome};

#[derive(Debug, Default)]
struct Inner {
    jobs: Vec<StoredJob>,
    next_id: i64,
}

impl Inner {
    fn insert(&mut self, posting: &JobPosting) -> StorageResult<i64> {
        if self.jobs.iter().any(|j| j.posting.apply_link == posting.apply_link) {
            return Err(StorageError::ConstraintViolation(format!(
                "apply link already stored: {}",
                posting.apply_link
            )));
        }
        self.next_id += 1;
        self.jobs.push(StoredJob {
            id: self.next_id,
            posting: posting.clone(),
        });
        Ok(self.next_id)
    }

    fn update(&mut self, id: i64, posting: &JobPosting) -> StorageResult<()> {
        let stored = self
            .jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or(StorageError::NotFound(id))?;

        let kept = &stored.posting;
        let updated = JobPosting {
            applied: kept.applied,
            applied_at: kept.applied_at,
            date_scraped: kept.date_scraped,
            last_updated: Utc::now(),
            ..posting.clone()
        };
        stored.posting = updated;
        Ok(())
    }

    /// Newest first, like the SQLite store
    fn newest_matching(&self, limit: usize, pred: impl Fn(&JobPosting) -> bool) -> Vec<StoredJob> {
        self.jobs
            .iter()
            .rev()
            .filter(|j| pred(&j.posting))
            .take(limit)
            .cloned()
            .collect()
    }
}

/// [`JobStore`] that keeps everything in a vector
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    inner: Mutex<Inner>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> StorageResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StorageError::Database("store lock poisoned".to_string()))
    }

    /// All stored postings in insertion order
    pub fn all(&self) -> StorageResult<Vec<StoredJob>> {
        Ok(self.inner()?.jobs.clone())
    }
}

impl JobStore for MemoryJobStore {
    fn find_by_apply_link(&self, apply_link: &str) -> StorageResult<Option<StoredJob>> {
        let inner = self.inner()?;
        Ok(inner
            .jobs
            .iter()
            .find(|j| j.posting.apply_link == apply_link)
            .cloned())
    }

    fn find_by_title_company(&self, title: &str, company: &str) -> StorageResult<Vec<StoredJob>> {
        let key = group_key(title, company);
        let inner = self.inner()?;
        Ok(inner
            .jobs
            .iter()
            .filter(|j| group_key(&j.posting.title, &j.posting.company) == key)
            .cloned()
            .collect())
    }

    fn search(&self, query: &str, limit: usize) -> StorageResult<Vec<StoredJob>> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let inner = self.inner()?;
        Ok(inner.newest_matching(limit, |p| p.search_text.contains(&query)))
    }

    fn find_by_location(&self, location: &str, limit: usize) -> StorageResult<Vec<StoredJob>> {
        let location = location.trim().to_lowercase();
        if location.is_empty() {
            return Ok(Vec::new());
        }
        let inner = self.inner()?;
        Ok(inner.newest_matching(limit, |p| p.location.to_lowercase().contains(&location)))
    }

    fn insert(&self, posting: &JobPosting) -> StorageResult<i64> {
        self.inner()?.insert(posting)
    }

    fn update(&self, id: i64, posting: &JobPosting) -> StorageResult<()> {
        self.inner()?.update(id, posting)
    }

    fn upsert(&self, posting: &JobPosting) -> StorageResult<UpsertOutcome> {
        let mut inner = self.inner()?;
        let existing = inner
            .jobs
            .iter()
            .find(|j| j.posting.apply_link == posting.apply_link)
            .map(|j| j.id);

        match existing {
            Some(id) => {
                inner.update(id, posting)?;
                Ok(UpsertOutcome::Updated(id))
            }
            None => Ok(UpsertOutcome::Inserted(inner.insert(posting)?)),
        }
    }

    fn count(&self) -> StorageResult<usize> {
        Ok(self.inner()?.jobs.len())
    }

    fn title_company_groups(&self) -> StorageResult<Vec<TitleCompanyGroup>> {
        let inner = self.inner()?;
        let mut sizes: HashMap<(String, String), usize> = HashMap::new();
        for job in &inner.jobs {
            *sizes
                .entry(group_key(&job.posting.title, &job.posting.company))
                .or_insert(0) += 1;
        }

        let mut groups: Vec<TitleCompanyGroup> = sizes
            .into_iter()
            .filter(|(_, size)| *size > 1)
            .map(|((title, company), size)| TitleCompanyGroup {
                title,
                company,
                size,
            })
            .collect();
        groups.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.title.cmp(&b.title)));
        Ok(groups)
    }
}
