//! Wire/domain types for the GitHub object graph.
//!
//! Shapes mirror the GraphQL API: composite entities embed a shared base
//! field set by value (`Repository` = `RepositoryFields` + its connections,
//! `Issue` = `IssueFields` + its comments, and so on), and every paginated
//! collection is a [`Connection`]. Nullable GraphQL scalars are `Option`s;
//! actors of deleted accounts come back as `null`.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A user or organization, reduced to its login.
#[derive(Debug, Clone, Deserialize)]
pub struct Actor {
    pub login: String,
}

/// A git ref (base or head of a pull request).
#[derive(Debug, Clone, Deserialize)]
pub struct Ref {
    pub id: String,
    pub name: String,
    pub prefix: String,
}

/// Forward-pagination state of a connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// One page of a paginated collection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    pub page_info: PageInfo,
    pub nodes: Vec<T>,
}

/// Repository metadata fields (no connections).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryFields {
    pub created_at: DateTime<Utc>,
    pub database_id: Option<i64>,
    pub description: Option<String>,
    pub fork_count: i64,
    pub has_issues_enabled: bool,
    pub has_wiki_enabled: bool,
    pub homepage_url: Option<String>,
    pub is_archived: bool,
    pub is_fork: bool,
    pub is_locked: bool,
    pub is_mirror: bool,
    pub is_private: bool,
    pub is_template: bool,
    pub mirror_url: Option<String>,
    pub name: String,
    pub name_with_owner: String,
    pub open_graph_image_url: String,
    pub owner: Actor,
    pub pushed_at: Option<DateTime<Utc>>,
    pub resource_path: String,
    pub updated_at: DateTime<Utc>,
    pub url: String,
    pub uses_custom_open_graph_image: bool,
}

/// Root of the graph: repository fields plus the first page of its issue
/// and pull-request connections.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    #[serde(flatten)]
    pub fields: RepositoryFields,
    pub issues: Connection<Issue>,
    pub pull_requests: Connection<PullRequest>,
}

/// Issue fields (no connections).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueFields {
    pub author: Option<Actor>,
    pub body: String,
    pub closed: bool,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub created_via_email: bool,
    pub database_id: Option<i64>,
    pub includes_created_edit: bool,
    pub last_edited_at: Option<DateTime<Utc>>,
    pub locked: bool,
    pub number: i64,
    pub published_at: Option<DateTime<Utc>>,
    pub resource_path: String,
    pub state: String,
    pub title: String,
    pub updated_at: DateTime<Utc>,
    pub url: String,
}

/// An issue with the first page of its comments inlined.
#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    #[serde(flatten)]
    pub fields: IssueFields,
    pub comments: Connection<IssueComment>,
}

/// A comment on an issue or on a pull request (general PR comments reuse
/// this shape).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueComment {
    pub author: Option<Actor>,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub created_via_email: bool,
    pub database_id: Option<i64>,
    pub editor: Option<Actor>,
    pub includes_created_edit: bool,
    pub is_minimized: bool,
    pub last_edited_at: Option<DateTime<Utc>>,
    pub minimized_reason: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub resource_path: String,
    pub updated_at: DateTime<Utc>,
    pub url: String,
}

/// Pull-request fields: the issue field set plus merge and ref data.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestFields {
    pub active_lock_reason: Option<String>,
    pub additions: i64,
    pub author: Option<Actor>,
    pub base_ref: Option<Ref>,
    pub base_ref_name: String,
    pub body: String,
    pub changed_files: i64,
    pub closed: bool,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub created_via_email: bool,
    pub database_id: Option<i64>,
    pub deletions: i64,
    pub editor: Option<Actor>,
    pub head_ref: Option<Ref>,
    pub head_ref_name: String,
    pub id: String,
    pub includes_created_edit: bool,
    pub is_cross_repository: bool,
    pub last_edited_at: Option<DateTime<Utc>>,
    pub locked: bool,
    pub maintainer_can_modify: bool,
    pub mergeable: String,
    pub merged: bool,
    pub merged_at: Option<DateTime<Utc>>,
    pub merged_by: Option<Actor>,
    pub number: i64,
    pub permalink: String,
    pub published_at: Option<DateTime<Utc>>,
    pub resource_path: String,
    pub revert_resource_path: String,
    pub revert_url: String,
    pub state: String,
    pub title: String,
    pub updated_at: DateTime<Utc>,
    pub url: String,
}

/// A pull request with the first pages of its comment and review
/// connections inlined.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    #[serde(flatten)]
    pub fields: PullRequestFields,
    pub comments: Connection<IssueComment>,
    pub reviews: Connection<PullRequestReview>,
}

/// A pull-request review with the first page of its own comments inlined.
///
/// There is no follow-up query shape for "comments of review N", so pages
/// beyond the inlined one cannot be fetched (see the traversal for the
/// partial-fetch policy).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestReview {
    pub author: Option<Actor>,
    pub body: String,
    pub comments: Connection<PullRequestReviewComment>,
    pub created_at: DateTime<Utc>,
    pub created_via_email: bool,
    pub database_id: Option<i64>,
    pub editor: Option<Actor>,
    pub id: String,
    pub includes_created_edit: bool,
    pub last_edited_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub resource_path: String,
    pub state: String,
    pub submitted_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub url: String,
}

/// A comment attached to a pull-request review.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestReviewComment {
    pub author: Option<Actor>,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub created_via_email: bool,
    pub database_id: Option<i64>,
    pub editor: Option<Actor>,
    pub id: String,
    pub includes_created_edit: bool,
    pub is_minimized: bool,
    pub last_edited_at: Option<DateTime<Utc>>,
    pub minimized_reason: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub resource_path: String,
    pub updated_at: DateTime<Utc>,
    pub url: String,
}
