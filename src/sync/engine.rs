//! Pull/push/sync orchestration for one remote-backed source.
//!
//! The engine owns nothing: it borrows the cache mutably and the remote
//! adapter immutably for the duration of one operation, so two syncs
//! against the same cache cannot overlap. Files are processed one at a
//! time; within a push, every dirty file passes conflict detection before
//! any write is issued, and a single conflict aborts the whole batch.

use std::collections::HashSet;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::cache::FileCache;
use crate::error::{Result, SyncError};
use crate::remote::{RemoteStore, Token};

use super::conflict::{CheckOutcome, SyncConflict, check_file};

/// Where a sync run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStage {
    Idle,
    Pulling,
    Pushing,
    Done,
    Failed,
}

/// Outcome of one pull, push, or sync run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub success: bool,
    pub pulled: Vec<String>,
    pub pushed: Vec<String>,
    pub conflicts: Vec<SyncConflict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u128,
}

impl SyncReport {
    #[must_use]
    pub fn summary_line(&self) -> String {
        format!(
            "↓{} ↑{} ⚠{}{}",
            self.pulled.len(),
            self.pushed.len(),
            self.conflicts.len(),
            if self.success { "" } else { " (failed)" }
        )
    }
}

/// Sync orchestrator for one source.
pub struct SyncEngine<'a> {
    source: &'a str,
    remote: &'a dyn RemoteStore,
    cache: &'a mut FileCache,
    stage: SyncStage,
}

impl<'a> SyncEngine<'a> {
    pub fn new(source: &'a str, remote: &'a dyn RemoteStore, cache: &'a mut FileCache) -> Self {
        Self {
            source,
            remote,
            cache,
            stage: SyncStage::Idle,
        }
    }

    #[must_use]
    pub const fn stage(&self) -> SyncStage {
        self.stage
    }

    /// Pull remote state into the cache.
    ///
    /// Lists all remote task files, refreshes the cache from the listing,
    /// then force-fetches every listed path that is not dirty. Dirty
    /// paths are skipped: pulling never overwrites an unpushed edit. A
    /// listing failure fails the run with nothing pulled; a fetch failure
    /// fails it while reporting the paths already pulled.
    pub fn pull(&mut self) -> SyncReport {
        let start = Instant::now();
        self.stage = SyncStage::Pulling;
        info!(source = %self.source, "Pull started");

        let listing = match self.remote.list_files() {
            Ok(listing) => listing,
            Err(err) => {
                warn!(source = %self.source, error = %err, "Pull listing failed");
                self.stage = SyncStage::Failed;
                return SyncReport {
                    success: false,
                    error: Some(err.to_string()),
                    duration_ms: start.elapsed().as_millis(),
                    ..Default::default()
                };
            }
        };

        // Placeholder entries out of the listing force re-fetch below;
        // dirty entries are preserved by the cache.
        self.cache.refresh(self.source, &listing);

        let mut pulled = Vec::new();
        for file in &listing {
            if self.cache.is_dirty(self.source, &file.path) {
                info!(source = %self.source, path = %file.path, "Skipping dirty file on pull");
                continue;
            }
            match self.cache.read_file(self.source, &file.path, self.remote) {
                Ok(_) => pulled.push(file.path.clone()),
                Err(err) => {
                    warn!(source = %self.source, path = %file.path, error = %err, "Pull fetch failed");
                    self.stage = SyncStage::Failed;
                    return SyncReport {
                        success: false,
                        pulled,
                        error: Some(format!("{}: {err}", file.path)),
                        duration_ms: start.elapsed().as_millis(),
                        ..Default::default()
                    };
                }
            }
        }

        self.stage = SyncStage::Done;
        info!(source = %self.source, pulled = pulled.len(), "Pull completed");
        SyncReport {
            success: true,
            pulled,
            duration_ms: start.elapsed().as_millis(),
            ..Default::default()
        }
    }

    /// Push every dirty file, or nothing at all.
    ///
    /// All dirty files are conflict-checked before the first write. Any
    /// conflict aborts the entire push with zero remote writes, so a
    /// batch of edits either lands together or not at all.
    pub fn push(&mut self, message: &str) -> SyncReport {
        let start = Instant::now();
        self.stage = SyncStage::Pushing;

        let dirty = self.cache.list_dirty_files(self.source);
        if dirty.is_empty() {
            self.stage = SyncStage::Done;
            return SyncReport {
                success: true,
                duration_ms: start.elapsed().as_millis(),
                ..Default::default()
            };
        }
        info!(source = %self.source, files = dirty.len(), "Push started");

        let mut conflicts = Vec::new();
        let mut missing_remotely = HashSet::new();
        for file in &dirty {
            match check_file(self.remote, file) {
                Ok(CheckOutcome::Conflicted(conflict)) => conflicts.push(conflict),
                Ok(CheckOutcome::Clean) => {}
                Ok(CheckOutcome::Missing) => {
                    missing_remotely.insert(file.path.clone());
                }
                Err(err) => {
                    warn!(source = %self.source, path = %file.path, error = %err, "Conflict check failed");
                    self.stage = SyncStage::Failed;
                    return SyncReport {
                        success: false,
                        error: Some(format!("{}: {err}", file.path)),
                        duration_ms: start.elapsed().as_millis(),
                        ..Default::default()
                    };
                }
            }
        }

        if !conflicts.is_empty() {
            warn!(source = %self.source, conflicts = conflicts.len(), "Push aborted on conflicts");
            self.stage = SyncStage::Failed;
            let count = conflicts.len();
            return SyncReport {
                success: false,
                conflicts,
                error: Some(format!(
                    "{count} conflict{} must be resolved before pushing",
                    if count == 1 { "" } else { "s" }
                )),
                duration_ms: start.elapsed().as_millis(),
                ..Default::default()
            };
        }

        let mut pushed = Vec::new();
        for file in dirty {
            let content = file.local_content.clone().unwrap_or_default();
            // A file absent from the remote is created fresh even if we
            // once held a token for it (deleted out from under the edit).
            let expected = if missing_remotely.contains(&file.path) {
                Token::None
            } else {
                file.token.clone()
            };
            match self.remote.put_file(&file.path, &content, message, &expected) {
                Ok(new_token) => {
                    self.cache
                        .commit_push(self.source, &file.path, content, new_token);
                    pushed.push(file.path);
                }
                Err(err) => {
                    warn!(source = %self.source, path = %file.path, error = %err, "Push write failed");
                    self.stage = SyncStage::Failed;
                    return SyncReport {
                        success: false,
                        pushed,
                        error: Some(format!("{}: {err}", file.path)),
                        duration_ms: start.elapsed().as_millis(),
                        ..Default::default()
                    };
                }
            }
        }

        self.stage = SyncStage::Done;
        info!(source = %self.source, pushed = pushed.len(), "Push completed");
        SyncReport {
            success: true,
            pushed,
            duration_ms: start.elapsed().as_millis(),
            ..Default::default()
        }
    }

    /// Pull then push. A failed pull short-circuits and is returned
    /// unmodified; otherwise the pull's `pulled` list is merged into the
    /// push report.
    pub fn sync(&mut self, message: &str) -> SyncReport {
        let start = Instant::now();
        let pull_report = self.pull();
        if !pull_report.success {
            return pull_report;
        }

        let mut report = self.push(message);
        report.pulled = pull_report.pulled;
        report.duration_ms = start.elapsed().as_millis();
        report
    }

    /// Delete one file on the remote, guarded by its cached token, then
    /// drop the cache entry.
    pub fn delete(&mut self, path: &str, message: &str) -> Result<()> {
        let token = self
            .cache
            .get(self.source, path)
            .map(|entry| entry.token.clone())
            .ok_or_else(|| SyncError::NotFound(format!("{path} is not cached")))?;
        self.remote.delete_file(path, message, &token)?;
        self.cache.remove(self.source, path);
        info!(source = %self.source, path, "Deleted remote file");
        Ok(())
    }
}
