//! SQLite snapshot store.
//!
//! Rows are versioned through a `versions` JSON array: the first run that
//! observes a natural-key tuple inserts the row with `[tag]`, and every
//! later run that observes the identical tuple appends its tag iff absent.
//! The append happens inside the `INSERT ... ON CONFLICT` statement itself,
//! so the upsert is a single atomic operation. Readers never touch the
//! `_versioned` tables directly; they query the views installed by
//! [`set_active_version`](super::Store::set_active_version).

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, params};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{
    IssueComment, IssueFields, PullRequestFields, PullRequestReview, PullRequestReviewComment,
    RepositoryFields,
};
use crate::store::schema::apply_schema;
use crate::store::{Store, validate_version_tag};

const REPOSITORY_COLS: &str = "database_id, created_at, description, owner, name";
const ISSUE_COLS: &str = "database_id, title, body, number, repository_owner, repository_name";
const ISSUE_COMMENT_COLS: &str =
    "database_id, author, body, repository_owner, repository_name, issue_number";

/// (view, backing table, projected columns) for `set_active_version`.
const VIEWS: [(&str, &str, &str); 3] = [
    ("repositories", "repositories_versioned", REPOSITORY_COLS),
    ("issues", "issues_versioned", ISSUE_COLS),
    ("issue_comments", "issue_comments_versioned", ISSUE_COMMENT_COLS),
];

const TABLES: [&str; 3] = [
    "repositories_versioned",
    "issues_versioned",
    "issue_comments_versioned",
];

/// SQLite-backed snapshot store.
pub struct SqliteStore {
    conn: Connection,
    version: String,
}

impl SqliteStore {
    /// Open a snapshot database at the given path, creating it and applying
    /// the schema if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or the
    /// schema fails to apply.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        apply_schema(&conn)?;
        Ok(Self {
            conn,
            version: String::new(),
        })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self {
            conn,
            version: String::new(),
        })
    }

    fn version(&self) -> Result<&str> {
        if self.version.is_empty() {
            return Err(Error::InvalidVersionTag {
                tag: String::new(),
                reason: "set_version must be called before saving",
            });
        }
        Ok(&self.version)
    }
}

impl Store for SqliteStore {
    fn save_repository(&mut self, repository: &RepositoryFields) -> Result<()> {
        let version = self.version()?.to_string();
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO repositories_versioned
             (versions, database_id, created_at, description, owner, name)
             VALUES (json_array(?1), ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (database_id, created_at, description, owner, name)
             DO UPDATE SET versions =
               CASE WHEN EXISTS (SELECT 1 FROM json_each(repositories_versioned.versions)
                                 WHERE json_each.value = ?1)
                    THEN repositories_versioned.versions
                    ELSE json_insert(repositories_versioned.versions, '$[#]', ?1)
               END",
        )?;
        stmt.execute(params![
            version,
            repository.database_id.unwrap_or(0),
            repository.created_at.to_rfc3339(),
            repository.description.as_deref().unwrap_or(""),
            repository.owner.login,
            repository.name,
        ])?;
        Ok(())
    }

    fn save_issue(&mut self, owner: &str, name: &str, issue: &IssueFields) -> Result<()> {
        let version = self.version()?.to_string();
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO issues_versioned
             (versions, database_id, title, body, number, repository_owner, repository_name)
             VALUES (json_array(?1), ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (database_id, title, body, number, repository_owner, repository_name)
             DO UPDATE SET versions =
               CASE WHEN EXISTS (SELECT 1 FROM json_each(issues_versioned.versions)
                                 WHERE json_each.value = ?1)
                    THEN issues_versioned.versions
                    ELSE json_insert(issues_versioned.versions, '$[#]', ?1)
               END",
        )?;
        stmt.execute(params![
            version,
            issue.database_id.unwrap_or(0),
            issue.title,
            issue.body,
            issue.number,
            owner,
            name,
        ])?;
        Ok(())
    }

    fn save_issue_comment(
        &mut self,
        owner: &str,
        name: &str,
        issue_number: i64,
        comment: &IssueComment,
    ) -> Result<()> {
        let version = self.version()?.to_string();
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO issue_comments_versioned
             (versions, database_id, author, body, repository_owner, repository_name, issue_number)
             VALUES (json_array(?1), ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (database_id, author, body, repository_owner, repository_name, issue_number)
             DO UPDATE SET versions =
               CASE WHEN EXISTS (SELECT 1 FROM json_each(issue_comments_versioned.versions)
                                 WHERE json_each.value = ?1)
                    THEN issue_comments_versioned.versions
                    ELSE json_insert(issue_comments_versioned.versions, '$[#]', ?1)
               END",
        )?;
        stmt.execute(params![
            version,
            comment.database_id.unwrap_or(0),
            comment.author.as_ref().map_or("", |a| a.login.as_str()),
            comment.body,
            owner,
            name,
            issue_number,
        ])?;
        Ok(())
    }

    fn save_pull_request(&mut self, pull_request: &PullRequestFields) -> Result<()> {
        warn!(
            number = pull_request.number,
            "pull request persistence is not implemented; row not stored"
        );
        Ok(())
    }

    fn save_review(&mut self, review: &PullRequestReview) -> Result<()> {
        warn!(
            id = %review.id,
            "pull request review persistence is not implemented; row not stored"
        );
        Ok(())
    }

    fn save_review_comment(&mut self, comment: &PullRequestReviewComment) -> Result<()> {
        warn!(
            id = %comment.id,
            "review comment persistence is not implemented; row not stored"
        );
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn set_version(&mut self, version: &str) {
        self.version = version.to_string();
    }

    fn set_active_version(&mut self, version: &str) -> Result<()> {
        // The tag is embedded in DDL text because SQLite cannot bind
        // parameters inside CREATE VIEW; the allow-list keeps that safe.
        validate_version_tag(version)?;

        for (view, table, cols) in VIEWS {
            debug!(view, version, "redefining active view");
            self.conn.execute_batch(&format!(
                "DROP VIEW IF EXISTS {view};
                 CREATE VIEW {view} AS
                 SELECT {cols}
                 FROM {table}
                 WHERE EXISTS (SELECT 1 FROM json_each(versions)
                               WHERE json_each.value = '{version}')"
            ))?;
        }
        Ok(())
    }

    fn cleanup(&mut self, current: &str) -> Result<()> {
        validate_version_tag(current)?;

        let tx = self.conn.transaction()?;
        for table in TABLES {
            let deleted = tx.execute(
                &format!(
                    "DELETE FROM {table}
                     WHERE NOT EXISTS (SELECT 1 FROM json_each(versions)
                                       WHERE json_each.value = ?1)"
                ),
                params![current],
            )?;
            tx.execute(
                &format!("UPDATE {table} SET versions = json_array(?1)"),
                params![current],
            )?;
            debug!(table, deleted, "retired stale snapshot rows");
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures;

    fn run(store: &mut SqliteStore, tag: &str, f: impl FnOnce(&mut SqliteStore)) {
        store.set_version(tag);
        store.begin().unwrap();
        f(store);
        store.commit().unwrap();
    }

    fn count(store: &SqliteStore, table: &str) -> i64 {
        store
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })
            .unwrap()
    }

    fn versions_of(store: &SqliteStore, table: &str, number: i64) -> Vec<String> {
        let raw: String = store
            .conn
            .query_row(
                &format!("SELECT versions FROM {table} WHERE number = ?1"),
                [number],
                |row| row.get(0),
            )
            .unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn revisit_under_new_tag_extends_versions() {
        let mut store = SqliteStore::open_memory().unwrap();
        let issue = fixtures::issue_fields(1, "title", "body");

        run(&mut store, "v1", |s| {
            s.save_issue("octo", "repo", &issue).unwrap();
        });
        run(&mut store, "v2", |s| {
            s.save_issue("octo", "repo", &issue).unwrap();
        });

        assert_eq!(count(&store, "issues_versioned"), 1);
        assert_eq!(versions_of(&store, "issues_versioned", 1), vec!["v1", "v2"]);
    }

    #[test]
    fn revisit_under_same_tag_does_not_duplicate() {
        let mut store = SqliteStore::open_memory().unwrap();
        let issue = fixtures::issue_fields(1, "title", "body");

        run(&mut store, "v1", |s| {
            s.save_issue("octo", "repo", &issue).unwrap();
            s.save_issue("octo", "repo", &issue).unwrap();
        });
        run(&mut store, "v1", |s| {
            s.save_issue("octo", "repo", &issue).unwrap();
        });

        assert_eq!(count(&store, "issues_versioned"), 1);
        assert_eq!(versions_of(&store, "issues_versioned", 1), vec!["v1"]);
    }

    #[test]
    fn changed_field_inserts_new_row_and_preserves_old() {
        let mut store = SqliteStore::open_memory().unwrap();

        run(&mut store, "v1", |s| {
            s.save_issue("octo", "repo", &fixtures::issue_fields(1, "old title", "body"))
                .unwrap();
        });
        run(&mut store, "v2", |s| {
            s.save_issue("octo", "repo", &fixtures::issue_fields(1, "new title", "body"))
                .unwrap();
        });

        assert_eq!(count(&store, "issues_versioned"), 2);
        let tags: Vec<(String, String)> = store
            .conn
            .prepare("SELECT title, versions FROM issues_versioned ORDER BY rowid")
            .unwrap()
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(tags[0], ("old title".into(), "[\"v1\"]".into()));
        assert_eq!(tags[1], ("new title".into(), "[\"v2\"]".into()));
    }

    #[test]
    fn repository_and_comment_rows_persist() {
        let mut store = SqliteStore::open_memory().unwrap();
        let mut repo = fixtures::repo_fields("octo", "repo");
        repo.description = None;

        run(&mut store, "v1", |s| {
            s.save_repository(&repo).unwrap();
            s.save_issue_comment("octo", "repo", 1, &fixtures::comment(10, "alice", "hi"))
                .unwrap();
        });

        assert_eq!(count(&store, "repositories_versioned"), 1);
        assert_eq!(count(&store, "issue_comments_versioned"), 1);

        // Null description is coerced to '' so the uniqueness tuple holds
        let description: String = store
            .conn
            .query_row("SELECT description FROM repositories_versioned", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(description, "");

        let (author, issue_number): (String, i64) = store
            .conn
            .query_row(
                "SELECT author, issue_number FROM issue_comments_versioned",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(author, "alice");
        assert_eq!(issue_number, 1);
    }

    #[test]
    fn rollback_discards_the_whole_run() {
        let mut store = SqliteStore::open_memory().unwrap();

        store.set_version("v1");
        store.begin().unwrap();
        store
            .save_issue("octo", "repo", &fixtures::issue_fields(1, "t", "b"))
            .unwrap();
        store
            .save_issue_comment("octo", "repo", 1, &fixtures::comment(10, "alice", "hi"))
            .unwrap();
        store.rollback().unwrap();

        assert_eq!(count(&store, "issues_versioned"), 0);
        assert_eq!(count(&store, "issue_comments_versioned"), 0);
    }

    #[test]
    fn saving_without_a_version_is_an_error() {
        let mut store = SqliteStore::open_memory().unwrap();
        let err = store
            .save_issue("octo", "repo", &fixtures::issue_fields(1, "t", "b"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidVersionTag { .. }));
    }

    #[test]
    fn active_view_exposes_only_the_chosen_tag() {
        let mut store = SqliteStore::open_memory().unwrap();
        let unchanged = fixtures::issue_fields(1, "stable", "body");

        run(&mut store, "v1", |s| {
            s.save_issue("octo", "repo", &unchanged).unwrap();
            s.save_issue("octo", "repo", &fixtures::issue_fields(2, "drifting", "old"))
                .unwrap();
        });
        run(&mut store, "v2", |s| {
            s.save_issue("octo", "repo", &unchanged).unwrap();
            s.save_issue("octo", "repo", &fixtures::issue_fields(2, "drifting", "new"))
                .unwrap();
        });

        store.set_active_version("v2").unwrap();

        let rows: Vec<(i64, String, String)> = store
            .conn
            .prepare(
                "SELECT number, title, body FROM issues ORDER BY number",
            )
            .unwrap()
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();

        // Issue 1 is shared between tags; issue 2 only via its v2 revision.
        assert_eq!(
            rows,
            vec![
                (1, "stable".to_string(), "body".to_string()),
                (2, "drifting".to_string(), "new".to_string()),
            ]
        );

        // Re-pointing at v1 is just another view definition.
        store.set_active_version("v1").unwrap();
        let bodies: Vec<String> = store
            .conn
            .prepare("SELECT body FROM issues WHERE number = 2")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(bodies, vec!["old"]);
    }

    #[test]
    fn set_active_version_is_idempotent() {
        let mut store = SqliteStore::open_memory().unwrap();
        store.set_active_version("v1").unwrap();
        store.set_active_version("v1").unwrap();
        store.set_active_version("v2").unwrap();
    }

    #[test]
    fn cleanup_keeps_exactly_the_active_rows() {
        let mut store = SqliteStore::open_memory().unwrap();
        let kept_a = fixtures::issue_fields(1, "kept a", "body");
        let kept_b = fixtures::issue_fields(2, "kept b", "body");

        run(&mut store, "v1", |s| {
            s.save_issue("octo", "repo", &kept_a).unwrap();
            s.save_issue("octo", "repo", &fixtures::issue_fields(3, "stale", "body"))
                .unwrap();
        });
        run(&mut store, "v2", |s| {
            s.save_issue("octo", "repo", &kept_a).unwrap();
            s.save_issue("octo", "repo", &kept_b).unwrap();
        });

        store.set_active_version("v2").unwrap();
        let active: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM issues", [], |r| r.get(0))
            .unwrap();

        store.cleanup("v2").unwrap();

        assert_eq!(count(&store, "issues_versioned"), active);
        assert_eq!(versions_of(&store, "issues_versioned", 1), vec!["v2"]);
        assert_eq!(versions_of(&store, "issues_versioned", 2), vec!["v2"]);
    }

    #[test]
    fn hostile_tag_is_rejected_before_any_ddl() {
        let mut store = SqliteStore::open_memory().unwrap();
        run(&mut store, "v1", |s| {
            s.save_issue("octo", "repo", &fixtures::issue_fields(1, "t", "b"))
                .unwrap();
        });

        let err = store
            .set_active_version("v1'; DROP TABLE issues_versioned; --")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidVersionTag { .. }));
        assert_eq!(count(&store, "issues_versioned"), 1);

        let err = store.cleanup("x'); DELETE FROM issues_versioned; --").unwrap_err();
        assert!(matches!(err, Error::InvalidVersionTag { .. }));
        assert_eq!(count(&store, "issues_versioned"), 1);
    }

    #[test]
    fn unimplemented_saves_report_success() {
        let mut store = SqliteStore::open_memory().unwrap();
        store.set_version("v1");

        store
            .save_pull_request(&fixtures::pr_fields(5, "pr"))
            .unwrap();
        store
            .save_review(&fixtures::review("R1", "APPROVED", fixtures::page(vec![], None)))
            .unwrap();
        store
            .save_review_comment(&fixtures::review_comment("RC1", "nit"))
            .unwrap();
    }

    #[test]
    fn open_creates_the_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots.db");

        let mut store = SqliteStore::open(&path).unwrap();
        run(&mut store, "v1", |s| {
            s.save_issue("octo", "repo", &fixtures::issue_fields(1, "t", "b"))
                .unwrap();
        });
        drop(store);

        assert!(path.exists());
        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(count(&reopened, "issues_versioned"), 1);
    }
}
