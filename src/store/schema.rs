//! Database schema for the versioned tables.
//!
//! Each `_versioned` table pairs the entity's natural-key column tuple with
//! a `versions` column holding a JSON array of snapshot tags. The uniqueness
//! constraint spans the whole natural-key tuple: a row whose tracked fields
//! recur unchanged across runs conflicts and has its tag array extended,
//! while any changed field lands as a fresh row. The `repositories`,
//! `issues`, and `issue_comments` views over these tables are created by
//! `set_active_version`, not here.

use rusqlite::Connection;

/// The complete SQL schema for a snapshot database.
pub const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS repositories_versioned (
    versions TEXT NOT NULL,
    database_id INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    description TEXT NOT NULL,
    owner TEXT NOT NULL,
    name TEXT NOT NULL,
    UNIQUE (database_id, created_at, description, owner, name)
);

CREATE TABLE IF NOT EXISTS issues_versioned (
    versions TEXT NOT NULL,
    database_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    body TEXT NOT NULL,
    number INTEGER NOT NULL,
    repository_owner TEXT NOT NULL,
    repository_name TEXT NOT NULL,
    UNIQUE (database_id, title, body, number, repository_owner, repository_name)
);

CREATE TABLE IF NOT EXISTS issue_comments_versioned (
    versions TEXT NOT NULL,
    database_id INTEGER NOT NULL,
    author TEXT NOT NULL,
    body TEXT NOT NULL,
    repository_owner TEXT NOT NULL,
    repository_name TEXT NOT NULL,
    issue_number INTEGER NOT NULL,
    UNIQUE (database_id, author, body, repository_owner, repository_name, issue_number)
);
";

/// Apply the schema idempotently.
///
/// # Errors
///
/// Returns an error if any DDL statement fails.
pub fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
