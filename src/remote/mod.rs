//! Remote content adapters.
//!
//! The sync core talks to a remote repository through the [`RemoteStore`]
//! trait: read/write/delete files by path, guarded by opaque integrity
//! tokens for optimistic concurrency. [`github::GithubRemote`] is the
//! production implementation; [`mock::MockRemote`] backs the test suites.

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod github;
pub mod mock;

pub use github::{GithubRemote, RetryConfig};
pub use mock::MockRemote;

/// Integrity token identifying one version of a remote file's content.
///
/// `None` means "no remote version observed yet": the entry exists only
/// locally and a push must create rather than update. A tagged variant is
/// used instead of an empty-string sentinel so an adapter whose hashes can
/// legitimately be empty cannot be misread as "new file".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "hash")]
pub enum Token {
    None,
    Known(String),
}

impl Token {
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// The hash for a known version, if any.
    #[must_use]
    pub fn as_known(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Known(hash) => Some(hash.as_str()),
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("(none)"),
            Self::Known(hash) => f.write_str(hash),
        }
    }
}

/// One entry in a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,
    pub token: Token,
}

/// A fetched remote file: content plus the token it corresponds to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteContent {
    pub content: String,
    pub token: Token,
}

/// Authenticated access to task files in a remote repository.
///
/// Every method is a suspension point from the core's point of view: calls
/// may take arbitrarily long and fail with any [`crate::SyncError`]
/// variant. Implementations own their retry and timeout policy; the cache
/// and engine never retry.
pub trait RemoteStore {
    /// Recursively list markdown task files under the configured root.
    fn list_files(&self) -> Result<Vec<RemoteFile>>;

    /// Fetch one file. Fails with `NotFound` if absent.
    fn get_file(&self, path: &str) -> Result<RemoteContent>;

    /// Create (`expected == Token::None`) or update a file, returning the
    /// new integrity token. Fails with `Conflict` when the remote version
    /// no longer matches `expected`.
    fn put_file(&self, path: &str, content: &str, message: &str, expected: &Token)
    -> Result<Token>;

    /// Delete a file. Fails with `Conflict` on a stale token and
    /// `NotFound` if the file is already gone.
    fn delete_file(&self, path: &str, message: &str, token: &Token) -> Result<()>;
}
