//! Console snapshot store.
//!
//! Prints one line per discovered entity instead of persisting anything;
//! used for dry runs when no database path is given. Lifecycle and
//! versioning calls are no-ops.

use crate::error::Result;
use crate::model::{
    IssueComment, IssueFields, PullRequestFields, PullRequestReview, PullRequestReviewComment,
    RepositoryFields,
};
use crate::store::Store;

/// Longest body excerpt printed per entity.
const EXCERPT_LEN: usize = 40;

/// Store that prints entities to stdout.
#[derive(Debug, Default)]
pub struct ConsoleStore;

impl Store for ConsoleStore {
    fn save_repository(&mut self, repository: &RepositoryFields) -> Result<()> {
        println!(
            "repository data fetched for {}/{}",
            repository.owner.login, repository.name
        );
        Ok(())
    }

    fn save_issue(&mut self, _owner: &str, _name: &str, issue: &IssueFields) -> Result<()> {
        println!("issue data fetched for #{} {}", issue.number, issue.title);
        Ok(())
    }

    fn save_issue_comment(
        &mut self,
        _owner: &str,
        _name: &str,
        _issue_number: i64,
        comment: &IssueComment,
    ) -> Result<()> {
        println!(
            "  issue comment data fetched by {} at {}: {:?}",
            login(comment.author.as_ref().map(|a| a.login.as_str())),
            comment.created_at,
            excerpt(&comment.body)
        );
        Ok(())
    }

    fn save_pull_request(&mut self, pull_request: &PullRequestFields) -> Result<()> {
        println!(
            "PR data fetched for #{} {}",
            pull_request.number, pull_request.title
        );
        Ok(())
    }

    fn save_review(&mut self, review: &PullRequestReview) -> Result<()> {
        println!(
            "  PR review data fetched by {} at {}: {:?}",
            login(review.author.as_ref().map(|a| a.login.as_str())),
            review.created_at,
            excerpt(&review.body)
        );
        Ok(())
    }

    fn save_review_comment(&mut self, comment: &PullRequestReviewComment) -> Result<()> {
        println!(
            "    PR review comment data fetched by {} at {}: {:?}",
            login(comment.author.as_ref().map(|a| a.login.as_str())),
            comment.created_at,
            excerpt(&comment.body)
        );
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        Ok(())
    }

    fn set_version(&mut self, _version: &str) {}

    fn set_active_version(&mut self, _version: &str) -> Result<()> {
        Ok(())
    }

    fn cleanup(&mut self, _current: &str) -> Result<()> {
        Ok(())
    }
}

fn login(author: Option<&str>) -> &str {
    author.unwrap_or("(deleted)")
}

/// Truncate a free-text body to at most [`EXCERPT_LEN`] display characters.
fn excerpt(body: &str) -> String {
    if body.chars().count() > EXCERPT_LEN {
        let mut cut: String = body.chars().take(EXCERPT_LEN - 1).collect();
        cut.push_str("...");
        cut
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_bodies_pass_through() {
        assert_eq!(excerpt("hello"), "hello");
        assert_eq!(excerpt(&"x".repeat(EXCERPT_LEN)), "x".repeat(EXCERPT_LEN));
    }

    #[test]
    fn long_bodies_are_truncated_with_ellipsis() {
        let long = "y".repeat(EXCERPT_LEN + 1);
        let cut = excerpt(&long);
        assert_eq!(cut, format!("{}...", "y".repeat(EXCERPT_LEN - 1)));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let long = "é".repeat(EXCERPT_LEN + 5);
        let cut = excerpt(&long);
        assert_eq!(cut.chars().count(), EXCERPT_LEN - 1 + 3);
    }

    #[test]
    fn lifecycle_calls_are_no_ops() {
        let mut store = ConsoleStore;
        store.begin().unwrap();
        store.set_version("v1");
        store.set_active_version("v1").unwrap();
        store.cleanup("v1").unwrap();
        store.commit().unwrap();
        store.rollback().unwrap();
    }
}
