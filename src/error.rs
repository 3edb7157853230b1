//! Error types for ghmeta.
//!
//! A single crate-wide error enum with category-based exit codes
//! (2=database, 3=remote API, 4=validation, 8=serialization).

use thiserror::Error;

/// Result type alias for ghmeta operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while synchronizing or querying snapshots.
#[derive(Error, Debug)]
pub enum Error {
    #[error("GitHub API error: {0}")]
    Api(String),

    #[error("malformed API response: {0}")]
    Protocol(String),

    #[error("repository not found: {owner}/{name}")]
    RepositoryNotFound { owner: String, name: String },

    #[error("invalid version tag {tag:?}: {reason}")]
    InvalidVersionTag { tag: String, reason: &'static str },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Category-based exit code for the binary.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Database(_) => 2,
            Self::Api(_) | Self::Protocol(_) | Self::Http(_) | Self::RepositoryNotFound { .. } => 3,
            Self::InvalidVersionTag { .. } => 4,
            Self::Json(_) => 8,
        }
    }
}
