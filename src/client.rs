//! GraphQL query executor for the GitHub v4 API.
//!
//! [`Api`] is the seam the traversal depends on: one typed request/response
//! method per query shape, plus the rate-limit read. [`GithubClient`] is the
//! production implementation — a blocking HTTP client posting GraphQL
//! documents with a bearer token. Transport concerns beyond that (response
//! caching, retry, rate-limit backoff) are deliberately absent; any error
//! from a query is terminal for the traversal that issued it.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{Connection, Issue, IssueComment, PullRequest, PullRequestReview, Repository};

/// Typed query surface consumed by the traversal.
///
/// `repository` is the root query: it returns repository metadata with the
/// first page of every nested connection inlined. The `*_page` methods are
/// the narrowly-scoped follow-ups, each resuming one connection from an
/// opaque cursor. `rate_remaining` reads the API quota left for this token.
pub trait Api {
    fn repository(&self, owner: &str, name: &str, page_size: i64) -> Result<Repository>;

    fn issues_page(
        &self,
        owner: &str,
        name: &str,
        page_size: i64,
        cursor: &str,
    ) -> Result<Connection<Issue>>;

    fn issue_comments_page(
        &self,
        owner: &str,
        name: &str,
        number: i64,
        page_size: i64,
        cursor: &str,
    ) -> Result<Connection<IssueComment>>;

    fn pull_requests_page(
        &self,
        owner: &str,
        name: &str,
        page_size: i64,
        cursor: &str,
    ) -> Result<Connection<PullRequest>>;

    fn pull_request_comments_page(
        &self,
        owner: &str,
        name: &str,
        number: i64,
        page_size: i64,
        cursor: &str,
    ) -> Result<Connection<IssueComment>>;

    fn reviews_page(
        &self,
        owner: &str,
        name: &str,
        number: i64,
        page_size: i64,
        cursor: &str,
    ) -> Result<Connection<PullRequestReview>>;

    fn rate_remaining(&self) -> Result<i64>;
}

const ENDPOINT: &str = "https://api.github.com/graphql";

// Fragments shared by the query documents below. `reviewFields` pulls in the
// first page of each review's own comments because there is no query shape
// that addresses a single review directly.
const REPO_FRAGMENT: &str = "
fragment repoFields on Repository {
  createdAt databaseId description forkCount hasIssuesEnabled hasWikiEnabled
  homepageUrl isArchived isFork isLocked isMirror isPrivate isTemplate
  mirrorUrl name nameWithOwner openGraphImageUrl owner { login } pushedAt
  resourcePath updatedAt url usesCustomOpenGraphImage
}";

const COMMENT_FRAGMENT: &str = "
fragment commentFields on IssueComment {
  author { login } body createdAt createdViaEmail databaseId editor { login }
  includesCreatedEdit isMinimized lastEditedAt minimizedReason publishedAt
  resourcePath updatedAt url
}";

const ISSUE_FRAGMENT: &str = "
fragment issueFields on Issue {
  author { login } body closed closedAt createdAt createdViaEmail databaseId
  includesCreatedEdit lastEditedAt locked number publishedAt resourcePath
  state title updatedAt url
}";

const PR_FRAGMENT: &str = "
fragment prFields on PullRequest {
  activeLockReason additions author { login } baseRef { id name prefix }
  baseRefName body changedFiles closed closedAt createdAt createdViaEmail
  databaseId deletions editor { login } headRef { id name prefix } headRefName
  id includesCreatedEdit isCrossRepository lastEditedAt locked
  maintainerCanModify mergeable merged mergedAt mergedBy { login } number
  permalink publishedAt resourcePath revertResourcePath revertUrl state title
  updatedAt url
}";

const REVIEW_COMMENT_FRAGMENT: &str = "
fragment reviewCommentFields on PullRequestReviewComment {
  author { login } body createdAt createdViaEmail databaseId editor { login }
  id includesCreatedEdit isMinimized lastEditedAt minimizedReason publishedAt
  resourcePath updatedAt url
}";

const REVIEW_FRAGMENT: &str = "
fragment reviewFields on PullRequestReview {
  author { login } body createdAt createdViaEmail databaseId editor { login }
  id includesCreatedEdit lastEditedAt publishedAt resourcePath state
  submittedAt updatedAt url
  comments(first: $pageSize) {
    pageInfo { hasNextPage endCursor }
    nodes { ...reviewCommentFields }
  }
}";

/// GraphQL response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<D> {
    data: Option<D>,
    errors: Option<Vec<GraphError>>,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct RepositoryData<R> {
    repository: Option<R>,
}

#[derive(Debug, Deserialize)]
struct IssuesNode {
    issues: Connection<Issue>,
}

#[derive(Debug, Deserialize)]
struct IssueNode {
    issue: Option<IssueCommentsNode>,
}

#[derive(Debug, Deserialize)]
struct IssueCommentsNode {
    comments: Connection<IssueComment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestsNode {
    pull_requests: Connection<PullRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestNode<T> {
    pull_request: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ReviewsNode {
    reviews: Connection<PullRequestReview>,
}

#[derive(Debug, Deserialize)]
struct RateLimitData {
    #[serde(rename = "rateLimit")]
    rate_limit: RateLimit,
}

#[derive(Debug, Deserialize)]
struct RateLimit {
    remaining: i64,
}

/// Blocking GitHub GraphQL client.
pub struct GithubClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    token: String,
}

impl GithubClient {
    /// Build a client authenticating with a personal access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(token: String) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("ghmeta/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            endpoint: ENDPOINT.to_string(),
            token,
        })
    }

    /// Point the client at a different GraphQL endpoint (GitHub Enterprise).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn execute<D: DeserializeOwned>(&self, query: &str, variables: serde_json::Value) -> Result<D> {
        debug!(endpoint = %self.endpoint, "executing query");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()?
            .error_for_status()?;

        let envelope: Envelope<D> = response.json()?;

        if let Some(errors) = envelope.errors {
            if !errors.is_empty() {
                let joined = errors
                    .into_iter()
                    .map(|e| e.message)
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(Error::Api(joined));
            }
        }

        envelope
            .data
            .ok_or_else(|| Error::Protocol("response contained no data".into()))
    }
}

impl Api for GithubClient {
    fn repository(&self, owner: &str, name: &str, page_size: i64) -> Result<Repository> {
        let query = format!(
            "query($owner: String!, $name: String!, $pageSize: Int!) {{
              repository(owner: $owner, name: $name) {{
                ...repoFields
                issues(first: $pageSize) {{
                  pageInfo {{ hasNextPage endCursor }}
                  nodes {{
                    ...issueFields
                    comments(first: $pageSize) {{
                      pageInfo {{ hasNextPage endCursor }}
                      nodes {{ ...commentFields }}
                    }}
                  }}
                }}
                pullRequests(first: $pageSize) {{
                  pageInfo {{ hasNextPage endCursor }}
                  nodes {{
                    ...prFields
                    comments(first: $pageSize) {{
                      pageInfo {{ hasNextPage endCursor }}
                      nodes {{ ...commentFields }}
                    }}
                    reviews(first: $pageSize) {{
                      pageInfo {{ hasNextPage endCursor }}
                      nodes {{ ...reviewFields }}
                    }}
                  }}
                }}
              }}
            }}
            {REPO_FRAGMENT}{ISSUE_FRAGMENT}{COMMENT_FRAGMENT}{PR_FRAGMENT}{REVIEW_FRAGMENT}{REVIEW_COMMENT_FRAGMENT}"
        );

        let data: RepositoryData<Repository> = self.execute(
            &query,
            json!({ "owner": owner, "name": name, "pageSize": page_size }),
        )?;
        data.repository.ok_or_else(|| Error::RepositoryNotFound {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    fn issues_page(
        &self,
        owner: &str,
        name: &str,
        page_size: i64,
        cursor: &str,
    ) -> Result<Connection<Issue>> {
        let query = format!(
            "query($owner: String!, $name: String!, $pageSize: Int!, $cursor: String!) {{
              repository(owner: $owner, name: $name) {{
                issues(first: $pageSize, after: $cursor) {{
                  pageInfo {{ hasNextPage endCursor }}
                  nodes {{
                    ...issueFields
                    comments(first: $pageSize) {{
                      pageInfo {{ hasNextPage endCursor }}
                      nodes {{ ...commentFields }}
                    }}
                  }}
                }}
              }}
            }}
            {ISSUE_FRAGMENT}{COMMENT_FRAGMENT}"
        );

        let data: RepositoryData<IssuesNode> = self.execute(
            &query,
            json!({ "owner": owner, "name": name, "pageSize": page_size, "cursor": cursor }),
        )?;
        Ok(data
            .repository
            .ok_or_else(|| Error::RepositoryNotFound {
                owner: owner.to_string(),
                name: name.to_string(),
            })?
            .issues)
    }

    fn issue_comments_page(
        &self,
        owner: &str,
        name: &str,
        number: i64,
        page_size: i64,
        cursor: &str,
    ) -> Result<Connection<IssueComment>> {
        let query = format!(
            "query($owner: String!, $name: String!, $number: Int!, $pageSize: Int!, $cursor: String!) {{
              repository(owner: $owner, name: $name) {{
                issue(number: $number) {{
                  comments(first: $pageSize, after: $cursor) {{
                    pageInfo {{ hasNextPage endCursor }}
                    nodes {{ ...commentFields }}
                  }}
                }}
              }}
            }}
            {COMMENT_FRAGMENT}"
        );

        let data: RepositoryData<IssueNode> = self.execute(
            &query,
            json!({
                "owner": owner, "name": name, "number": number,
                "pageSize": page_size, "cursor": cursor,
            }),
        )?;
        let issue = data
            .repository
            .ok_or_else(|| Error::RepositoryNotFound {
                owner: owner.to_string(),
                name: name.to_string(),
            })?
            .issue
            .ok_or_else(|| Error::Protocol(format!("issue #{number} disappeared mid-walk")))?;
        Ok(issue.comments)
    }

    fn pull_requests_page(
        &self,
        owner: &str,
        name: &str,
        page_size: i64,
        cursor: &str,
    ) -> Result<Connection<PullRequest>> {
        let query = format!(
            "query($owner: String!, $name: String!, $pageSize: Int!, $cursor: String!) {{
              repository(owner: $owner, name: $name) {{
                pullRequests(first: $pageSize, after: $cursor) {{
                  pageInfo {{ hasNextPage endCursor }}
                  nodes {{
                    ...prFields
                    comments(first: $pageSize) {{
                      pageInfo {{ hasNextPage endCursor }}
                      nodes {{ ...commentFields }}
                    }}
                    reviews(first: $pageSize) {{
                      pageInfo {{ hasNextPage endCursor }}
                      nodes {{ ...reviewFields }}
                    }}
                  }}
                }}
              }}
            }}
            {PR_FRAGMENT}{COMMENT_FRAGMENT}{REVIEW_FRAGMENT}{REVIEW_COMMENT_FRAGMENT}"
        );

        let data: RepositoryData<PullRequestsNode> = self.execute(
            &query,
            json!({ "owner": owner, "name": name, "pageSize": page_size, "cursor": cursor }),
        )?;
        Ok(data
            .repository
            .ok_or_else(|| Error::RepositoryNotFound {
                owner: owner.to_string(),
                name: name.to_string(),
            })?
            .pull_requests)
    }

    fn pull_request_comments_page(
        &self,
        owner: &str,
        name: &str,
        number: i64,
        page_size: i64,
        cursor: &str,
    ) -> Result<Connection<IssueComment>> {
        let query = format!(
            "query($owner: String!, $name: String!, $number: Int!, $pageSize: Int!, $cursor: String!) {{
              repository(owner: $owner, name: $name) {{
                pullRequest(number: $number) {{
                  comments(first: $pageSize, after: $cursor) {{
                    pageInfo {{ hasNextPage endCursor }}
                    nodes {{ ...commentFields }}
                  }}
                }}
              }}
            }}
            {COMMENT_FRAGMENT}"
        );

        let data: RepositoryData<PullRequestNode<IssueCommentsNode>> = self.execute(
            &query,
            json!({
                "owner": owner, "name": name, "number": number,
                "pageSize": page_size, "cursor": cursor,
            }),
        )?;
        let pr = data
            .repository
            .ok_or_else(|| Error::RepositoryNotFound {
                owner: owner.to_string(),
                name: name.to_string(),
            })?
            .pull_request
            .ok_or_else(|| Error::Protocol(format!("pull request #{number} disappeared mid-walk")))?;
        Ok(pr.comments)
    }

    fn reviews_page(
        &self,
        owner: &str,
        name: &str,
        number: i64,
        page_size: i64,
        cursor: &str,
    ) -> Result<Connection<PullRequestReview>> {
        let query = format!(
            "query($owner: String!, $name: String!, $number: Int!, $pageSize: Int!, $cursor: String!) {{
              repository(owner: $owner, name: $name) {{
                pullRequest(number: $number) {{
                  reviews(first: $pageSize, after: $cursor) {{
                    pageInfo {{ hasNextPage endCursor }}
                    nodes {{ ...reviewFields }}
                  }}
                }}
              }}
            }}
            {REVIEW_FRAGMENT}{REVIEW_COMMENT_FRAGMENT}"
        );

        let data: RepositoryData<PullRequestNode<ReviewsNode>> = self.execute(
            &query,
            json!({
                "owner": owner, "name": name, "number": number,
                "pageSize": page_size, "cursor": cursor,
            }),
        )?;
        let pr = data
            .repository
            .ok_or_else(|| Error::RepositoryNotFound {
                owner: owner.to_string(),
                name: name.to_string(),
            })?
            .pull_request
            .ok_or_else(|| Error::Protocol(format!("pull request #{number} disappeared mid-walk")))?;
        Ok(pr.reviews)
    }

    fn rate_remaining(&self) -> Result<i64> {
        let data: RateLimitData =
            self.execute("query { rateLimit { remaining } }", json!({}))?;
        Ok(data.rate_limit.remaining)
    }
}
