//! Snapshot stores.
//!
//! A [`Store`] receives every entity the traversal discovers and owns the
//! versioning scheme. Two implementations exist: [`SqliteStore`] persists
//! rows with version-tag tracking, [`ConsoleStore`] prints one line per
//! entity and is used for dry runs. The variant is chosen at startup and
//! passed around as `Box<dyn Store>`.

pub mod console;
pub mod schema;
pub mod sqlite;

pub use console::ConsoleStore;
pub use sqlite::SqliteStore;

use crate::error::{Error, Result};
use crate::model::{
    IssueComment, IssueFields, PullRequestFields, PullRequestReview, PullRequestReviewComment,
    RepositoryFields,
};

/// Longest accepted version tag.
pub const MAX_VERSION_TAG_LEN: usize = 128;

/// Receiver for discovered entities, plus the snapshot lifecycle.
///
/// All saves between `begin` and `commit` belong to one synchronization run
/// and share one transaction; `rollback` discards the run entirely. The tag
/// recorded via `set_version` is attached to every row the run touches.
pub trait Store {
    fn save_repository(&mut self, repository: &RepositoryFields) -> Result<()>;
    fn save_issue(&mut self, owner: &str, name: &str, issue: &IssueFields) -> Result<()>;
    fn save_issue_comment(
        &mut self,
        owner: &str,
        name: &str,
        issue_number: i64,
        comment: &IssueComment,
    ) -> Result<()>;
    fn save_pull_request(&mut self, pull_request: &PullRequestFields) -> Result<()>;
    fn save_review(&mut self, review: &PullRequestReview) -> Result<()>;
    fn save_review_comment(&mut self, comment: &PullRequestReviewComment) -> Result<()>;

    fn begin(&mut self) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
    fn rollback(&mut self) -> Result<()>;

    /// Record the tag under which subsequent saves register.
    fn set_version(&mut self, version: &str);

    /// (Re)define the active views to expose rows carrying `version`.
    /// Idempotent; callable repeatedly to re-point readers at any snapshot.
    fn set_active_version(&mut self, version: &str) -> Result<()>;

    /// Delete every row whose tag set excludes `current`, then collapse the
    /// survivors' tag sets to exactly `{current}`. Irreversible.
    fn cleanup(&mut self, current: &str) -> Result<()>;
}

/// Validate a version tag against the allow-list (`[A-Za-z0-9 ._:-]`,
/// 1-128 chars).
///
/// Tags end up embedded in view DDL, which SQLite cannot parameterize, so
/// the character set excludes quotes and every other SQL metacharacter.
///
/// # Errors
///
/// Returns [`Error::InvalidVersionTag`] if the tag is empty, too long, or
/// contains a character outside the allow-list.
pub fn validate_version_tag(tag: &str) -> Result<()> {
    if tag.is_empty() {
        return Err(Error::InvalidVersionTag {
            tag: tag.to_string(),
            reason: "tag must not be empty",
        });
    }
    if tag.len() > MAX_VERSION_TAG_LEN {
        return Err(Error::InvalidVersionTag {
            tag: tag.to_string(),
            reason: "tag exceeds 128 characters",
        });
    }
    if !tag
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '.' | '_' | ':' | '-'))
    {
        return Err(Error::InvalidVersionTag {
            tag: tag.to_string(),
            reason: "tag may only contain ASCII letters, digits, spaces, and ._:-",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_timestamps_and_plain_tags() {
        validate_version_tag("v1").unwrap();
        validate_version_tag("2024-03-01 12:00:00").unwrap();
        validate_version_tag("release_2.1:rc-3").unwrap();
    }

    #[test]
    fn rejects_empty_and_oversized_tags() {
        assert!(matches!(
            validate_version_tag(""),
            Err(Error::InvalidVersionTag { .. })
        ));
        assert!(matches!(
            validate_version_tag(&"x".repeat(MAX_VERSION_TAG_LEN + 1)),
            Err(Error::InvalidVersionTag { .. })
        ));
    }

    #[test]
    fn rejects_sql_metacharacters() {
        for tag in ["v1'; DROP VIEW issues; --", "v1\"", "v1;", "v(1)", "v1\n"] {
            assert!(
                matches!(validate_version_tag(tag), Err(Error::InvalidVersionTag { .. })),
                "tag {tag:?} should be rejected"
            );
        }
    }
}
