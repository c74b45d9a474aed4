//! Database schema definitions
//!
//! This module contains the SQL schema for the Job-Sift database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Normalized job postings; apply_link is the natural identity
CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    company TEXT NOT NULL,
    location TEXT NOT NULL,
    apply_link TEXT NOT NULL,
    posted_date TEXT NOT NULL,
    salary TEXT,
    tags TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL,
    applied INTEGER NOT NULL DEFAULT 0,
    applied_at TEXT,
    source TEXT NOT NULL,
    source_id TEXT NOT NULL,
    date_scraped TEXT NOT NULL,
    last_updated TEXT NOT NULL,
    search_text TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_jobs_apply_link ON jobs(apply_link);
CREATE INDEX IF NOT EXISTS idx_jobs_title_company ON jobs(lower(title), lower(company));
CREATE INDEX IF NOT EXISTS idx_jobs_source ON jobs(source, source_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_initializes() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_apply_link_is_unique() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        let insert = "INSERT INTO jobs (title, company, location, apply_link, posted_date, \
                      status, source, source_id, date_scraped, last_updated, search_text) \
                      VALUES ('t', 'c', 'l', 'https://x.test/1', 'd', 'active', 's', 'id', 'd', 'd', '')";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());
    }
}
