//! SQLite job store
//!
//! This module provides a SQLite-based implementation of the [`JobStore`]
//! trait. Tags are stored newline-separated and timestamps as RFC 3339 text.

use crate::models::{JobPosting, JobStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{JobStore, StorageError, StorageResult};
use crate::storage::{StoredJob, TitleCompanyGroup, UpsertOutcome};
use crate::IngestError;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const JOB_COLUMNS: &str = "id, title, company, location, apply_link, posted_date, salary, tags, \
                           status, applied, applied_at, source, source_id, date_scraped, \
                           last_updated, search_text";

/// SQLite job store
pub struct SqliteJobStore {
    conn: Mutex<Connection>,
}

impl SqliteJobStore {
    /// Creates a new SqliteJobStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteJobStore)` - Successfully opened/created database
    /// * `Err(IngestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, IngestError> {
        let conn = Connection::open(path).map_err(StorageError::from)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )
        .map_err(StorageError::from)?;

        initialize_schema(&conn).map_err(StorageError::from)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, IngestError> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        initialize_schema(&conn).map_err(StorageError::from)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Database("connection lock poisoned".to_string()))
    }

    fn query_jobs(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StorageResult<Vec<StoredJob>> {
        let mut stmt = conn.prepare(sql)?;
        let jobs = stmt
            .query_map(params, row_to_job)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    fn insert_with(conn: &Connection, posting: &JobPosting) -> StorageResult<i64> {
        let result = conn.execute(
            "INSERT INTO jobs (title, company, location, apply_link, posted_date, salary, tags,
                               status, applied, applied_at, source, source_id, date_scraped,
                               last_updated, search_text)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                posting.title,
                posting.company,
                posting.location,
                posting.apply_link,
                posting.posted_date.to_rfc3339(),
                posting.salary,
                encode_tags(&posting.tags),
                posting.status.to_db_string(),
                posting.applied,
                posting.applied_at.map(|t| t.to_rfc3339()),
                posting.source,
                posting.source_id,
                posting.date_scraped.to_rfc3339(),
                posting.last_updated.to_rfc3339(),
                posting.search_text,
            ],
        );

        match result {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StorageError::ConstraintViolation(format!(
                    "apply link already stored: {}",
                    posting.apply_link
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn update_with(conn: &Connection, id: i64, posting: &JobPosting) -> StorageResult<()> {
        let changed = conn.execute(
            "UPDATE jobs SET title = ?1, company = ?2, location = ?3, apply_link = ?4,
                             posted_date = ?5, salary = ?6, tags = ?7, status = ?8,
                             source = ?9, source_id = ?10, last_updated = ?11, search_text = ?12
             WHERE id = ?13",
            params![
                posting.title,
                posting.company,
                posting.location,
                posting.apply_link,
                posting.posted_date.to_rfc3339(),
                posting.salary,
                encode_tags(&posting.tags),
                posting.status.to_db_string(),
                posting.source,
                posting.source_id,
                Utc::now().to_rfc3339(),
                posting.search_text,
                id,
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::NotFound(id));
        }
        Ok(())
    }
}

impl JobStore for SqliteJobStore {
    fn find_by_apply_link(&self, apply_link: &str) -> StorageResult<Option<StoredJob>> {
        let conn = self.conn()?;
        let job = conn
            .query_row(
                &format!("SELECT {} FROM jobs WHERE apply_link = ?1", JOB_COLUMNS),
                params![apply_link],
                row_to_job,
            )
            .optional()?;
        Ok(job)
    }

    fn find_by_title_company(&self, title: &str, company: &str) -> StorageResult<Vec<StoredJob>> {
        let conn = self.conn()?;
        Self::query_jobs(
            &conn,
            &format!(
                "SELECT {} FROM jobs
                 WHERE lower(trim(title)) = lower(trim(?1)) AND lower(trim(company)) = lower(trim(?2))
                 ORDER BY id",
                JOB_COLUMNS
            ),
            params![title, company],
        )
    }

    fn search(&self, query: &str, limit: usize) -> StorageResult<Vec<StoredJob>> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn()?;
        Self::query_jobs(
            &conn,
            &format!(
                "SELECT {} FROM jobs WHERE instr(search_text, ?1) > 0 ORDER BY id DESC LIMIT ?2",
                JOB_COLUMNS
            ),
            params![query, limit as i64],
        )
    }

    fn find_by_location(&self, location: &str, limit: usize) -> StorageResult<Vec<StoredJob>> {
        let location = location.trim().to_lowercase();
        if location.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn()?;
        Self::query_jobs(
            &conn,
            &format!(
                "SELECT {} FROM jobs WHERE instr(lower(location), ?1) > 0 ORDER BY id DESC LIMIT ?2",
                JOB_COLUMNS
            ),
            params![location, limit as i64],
        )
    }

    fn insert(&self, posting: &JobPosting) -> StorageResult<i64> {
        let conn = self.conn()?;
        Self::insert_with(&conn, posting)
    }

    fn update(&self, id: i64, posting: &JobPosting) -> StorageResult<()> {
        let conn = self.conn()?;
        Self::update_with(&conn, id, posting)
    }

    fn upsert(&self, posting: &JobPosting) -> StorageResult<UpsertOutcome> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM jobs WHERE apply_link = ?1",
                params![posting.apply_link],
                |row| row.get(0),
            )
            .optional()?;

        let outcome = match existing {
            Some(id) => {
                Self::update_with(&tx, id, posting)?;
                UpsertOutcome::Updated(id)
            }
            None => UpsertOutcome::Inserted(Self::insert_with(&tx, posting)?),
        };

        tx.commit()?;
        Ok(outcome)
    }

    fn count(&self) -> StorageResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn title_company_groups(&self) -> StorageResult<Vec<TitleCompanyGroup>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT lower(trim(title)), lower(trim(company)), COUNT(*) FROM jobs
             GROUP BY lower(trim(title)), lower(trim(company))
             HAVING COUNT(*) > 1
             ORDER BY COUNT(*) DESC",
        )?;

        let groups = stmt
            .query_map([], |row| {
                Ok(TitleCompanyGroup {
                    title: row.get(0)?,
                    company: row.get(1)?,
                    size: row.get::<_, i64>(2)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(groups)
    }
}

fn encode_tags(tags: &[String]) -> String {
    tags.join("\n")
}

fn decode_tags(raw: &str) -> Vec<String> {
    raw.lines()
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_job(row: &Row<'_>) -> rusqlite::Result<StoredJob> {
    let applied_at: Option<String> = row.get(10)?;
    let applied_at = match applied_at {
        Some(raw) => Some(parse_timestamp(10, &raw)?),
        None => None,
    };

    let posting = JobPosting {
        title: row.get(1)?,
        company: row.get(2)?,
        location: row.get(3)?,
        apply_link: row.get(4)?,
        posted_date: parse_timestamp(5, &row.get::<_, String>(5)?)?,
        salary: row.get(6)?,
        tags: decode_tags(&row.get::<_, String>(7)?),
        status: JobStatus::from_db_string(&row.get::<_, String>(8)?).unwrap_or_default(),
        applied: row.get(9)?,
        applied_at,
        source: row.get(11)?,
        source_id: row.get(12)?,
        date_scraped: parse_timestamp(13, &row.get::<_, String>(13)?)?,
        last_updated: parse_timestamp(14, &row.get::<_, String>(14)?)?,
        search_text: row.get(15)?,
    };

    Ok(StoredJob {
        id: row.get(0)?,
        posting,
    })
}
