//! Mock `RemoteStore` for testing.
//!
//! In-memory remote repository for unit and integration tests that need
//! controlled remote state without network access. Supports error
//! injection and per-method call counters, which the push-atomicity tests
//! use to assert that zero writes reached the remote.
//!
//! For testing the real GitHub wire protocol (status mapping, base64,
//! headers), use the `httpmock`-backed tests in
//! `tests/integration/github_api_tests.rs` instead.

use std::collections::BTreeMap;
use std::sync::Mutex;

use sha2::{Digest, Sha256};

use crate::error::{Result, SyncError};

use super::{RemoteContent, RemoteFile, RemoteStore, Token};

/// Which mock method an injected error applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOp {
    List,
    Get,
    Put,
    Delete,
}

/// Error to inject on the next matching call.
#[derive(Debug, Clone)]
pub enum InjectedError {
    Unauthorized,
    RateLimited,
    RemoteUnavailable,
}

impl InjectedError {
    fn to_error(&self, context: &str) -> SyncError {
        match self {
            Self::Unauthorized => SyncError::Unauthorized(format!("mock: {context}")),
            Self::RateLimited => SyncError::RateLimited {
                message: format!("mock: {context}"),
                retry_after: Some(1),
            },
            Self::RemoteUnavailable => SyncError::RemoteUnavailable(format!("mock: {context}")),
        }
    }
}

/// Number of calls the mock has served, per method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list: usize,
    pub get: usize,
    pub put: usize,
    pub delete: usize,
}

#[derive(Debug, Default)]
struct MockState {
    files: BTreeMap<String, String>,
    counts: CallCounts,
    injected: Vec<(MockOp, InjectedError)>,
}

/// In-memory remote with sha256 content tokens.
#[derive(Debug, Default)]
pub struct MockRemote {
    state: Mutex<MockState>,
}

/// Token for a given content, as this mock mints them.
#[must_use]
pub fn content_token(content: &str) -> Token {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Token::Known(format!("{:x}", hasher.finalize()))
}

impl MockRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file directly, bypassing counters and token checks.
    pub fn seed(&self, path: &str, content: &str) {
        let mut state = self.state.lock().expect("mock lock");
        state.files.insert(path.to_string(), content.to_string());
    }

    /// Overwrite a file out-of-band, simulating a concurrent remote edit.
    pub fn mutate_behind_our_back(&self, path: &str, content: &str) {
        self.seed(path, content);
    }

    /// Remove a file out-of-band, simulating an external delete.
    pub fn delete_behind_our_back(&self, path: &str) {
        let mut state = self.state.lock().expect("mock lock");
        state.files.remove(path);
    }

    /// Queue an error for the next call of the given operation.
    pub fn inject_error(&self, op: MockOp, error: InjectedError) {
        let mut state = self.state.lock().expect("mock lock");
        state.injected.push((op, error));
    }

    #[must_use]
    pub fn counts(&self) -> CallCounts {
        self.state.lock().expect("mock lock").counts
    }

    /// Current content of a file, if present.
    #[must_use]
    pub fn content_of(&self, path: &str) -> Option<String> {
        self.state.lock().expect("mock lock").files.get(path).cloned()
    }

    fn take_injected(state: &mut MockState, op: MockOp) -> Option<InjectedError> {
        let idx = state.injected.iter().position(|(o, _)| *o == op)?;
        Some(state.injected.remove(idx).1)
    }
}

impl RemoteStore for MockRemote {
    fn list_files(&self) -> Result<Vec<RemoteFile>> {
        let mut state = self.state.lock().expect("mock lock");
        state.counts.list += 1;
        if let Some(err) = Self::take_injected(&mut state, MockOp::List) {
            return Err(err.to_error("list_files"));
        }
        Ok(state
            .files
            .iter()
            .map(|(path, content)| RemoteFile {
                path: path.clone(),
                token: content_token(content),
            })
            .collect())
    }

    fn get_file(&self, path: &str) -> Result<RemoteContent> {
        let mut state = self.state.lock().expect("mock lock");
        state.counts.get += 1;
        if let Some(err) = Self::take_injected(&mut state, MockOp::Get) {
            return Err(err.to_error("get_file"));
        }
        state
            .files
            .get(path)
            .map(|content| RemoteContent {
                content: content.clone(),
                token: content_token(content),
            })
            .ok_or_else(|| SyncError::NotFound(path.to_string()))
    }

    fn put_file(
        &self,
        path: &str,
        content: &str,
        _message: &str,
        expected: &Token,
    ) -> Result<Token> {
        let mut state = self.state.lock().expect("mock lock");
        state.counts.put += 1;
        if let Some(err) = Self::take_injected(&mut state, MockOp::Put) {
            return Err(err.to_error("put_file"));
        }

        // The server-side optimistic-concurrency double check.
        match (state.files.get(path), expected) {
            (Some(_), Token::None) => {
                return Err(SyncError::Conflict(format!(
                    "{path}: file already exists on the remote"
                )));
            }
            (Some(current), Token::Known(_)) if &content_token(current) != expected => {
                return Err(SyncError::Conflict(format!(
                    "{path}: remote version changed since last read"
                )));
            }
            (None, Token::Known(_)) => {
                return Err(SyncError::Conflict(format!(
                    "{path}: file no longer exists on the remote"
                )));
            }
            _ => {}
        }

        state.files.insert(path.to_string(), content.to_string());
        Ok(content_token(content))
    }

    fn delete_file(&self, path: &str, _message: &str, token: &Token) -> Result<()> {
        let mut state = self.state.lock().expect("mock lock");
        state.counts.delete += 1;
        if let Some(err) = Self::take_injected(&mut state, MockOp::Delete) {
            return Err(err.to_error("delete_file"));
        }

        let Some(current) = state.files.get(path) else {
            return Err(SyncError::NotFound(path.to_string()));
        };
        if &content_token(current) != token {
            return Err(SyncError::Conflict(format!(
                "{path}: remote version changed since last read"
            )));
        }
        state.files.remove(path);
        Ok(())
    }
}
