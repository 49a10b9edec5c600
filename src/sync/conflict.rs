//! Conflict detection, three-way merge, and resolution.
//!
//! A dirty cache entry conflicts when the remote integrity token has
//! diverged from the token the entry was cached under. The merge is a
//! positional line-based three-way merge against the common ancestor: it
//! does not align lines (no LCS/diff), so an insertion that shifts line
//! offsets in one branch will surface as line-level conflicts rather than
//! merging cleanly. That matches the behavior this module replaces and is
//! kept deliberately.

use serde::Serialize;
use tracing::debug;

use crate::cache::{CachedFile, FileCache};
use crate::error::{Result, SyncError};
use crate::remote::{RemoteStore, Token};

pub const LOCAL_MARKER: &str = "<<<<<<< LOCAL";
pub const SEPARATOR_MARKER: &str = "=======";
pub const REMOTE_MARKER: &str = ">>>>>>> REMOTE";

/// A detected divergence between a local edit and the current remote
/// version of one file. Ephemeral: built during a push attempt, consumed
/// by resolution, never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConflict {
    pub path: String,
    /// Content last cached before the local edit: the common ancestor.
    pub base_content: String,
    pub local_content: String,
    pub remote_content: String,
    pub local_token: Token,
    pub remote_token: Token,
}

/// Outcome of a three-way merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    /// True iff no unresolved conflicting lines remain.
    pub success: bool,
    /// Merged content, present iff `success`.
    pub content: Option<String>,
    pub has_conflicts: bool,
    /// Full content with inline conflict markers, present iff
    /// `has_conflicts`.
    pub conflict_markers: Option<String>,
}

/// How a conflict is settled. `Merged` carries the caller-supplied
/// content, so a merged resolution without content cannot be expressed.
#[derive(Debug, Clone)]
pub enum Resolution {
    Local,
    Remote,
    Merged(String),
}

/// What a pre-push check found for one dirty file.
#[derive(Debug, Clone)]
pub enum CheckOutcome {
    /// Remote unchanged since it was cached; write with the cached token.
    Clean,
    /// Remote file absent; the push must create it with no expected
    /// token, whether the file is brand new or was deleted out from
    /// under a local edit.
    Missing,
    Conflicted(SyncConflict),
}

/// Decide whether a dirty file conflicts with the current remote state.
///
/// A remote `NotFound` means nothing to conflict with (the file is being
/// created); a matching token means the remote is unchanged since it was
/// cached. Anything else is a conflict carrying both sides plus the
/// cached base for merging.
pub fn check_conflict(remote: &dyn RemoteStore, file: &CachedFile) -> Result<Option<SyncConflict>> {
    match check_file(remote, file)? {
        CheckOutcome::Conflicted(conflict) => Ok(Some(conflict)),
        CheckOutcome::Clean | CheckOutcome::Missing => Ok(None),
    }
}

/// Like [`check_conflict`], but distinguishes "remote unchanged" from
/// "remote absent" so the push can pick the right write mode.
pub fn check_file(remote: &dyn RemoteStore, file: &CachedFile) -> Result<CheckOutcome> {
    let current = match remote.get_file(&file.path) {
        Ok(current) => current,
        Err(SyncError::NotFound(_)) => {
            debug!(path = %file.path, "Remote file absent, treating as new file");
            return Ok(CheckOutcome::Missing);
        }
        Err(err) => return Err(err),
    };

    if current.token == file.token {
        return Ok(CheckOutcome::Clean);
    }

    debug!(
        path = %file.path,
        local_token = %file.token,
        remote_token = %current.token,
        "Integrity token diverged"
    );
    Ok(CheckOutcome::Conflicted(SyncConflict {
        path: file.path.clone(),
        base_content: file.content.clone(),
        local_content: file.local_content.clone().unwrap_or_default(),
        remote_content: current.content,
        local_token: file.token.clone(),
        remote_token: current.token,
    }))
}

/// Line-based three-way merge of a conflict.
///
/// Lines are compared by position; missing indices count as empty. A line
/// changed on only one side takes that side; a line changed identically
/// on both sides takes either; a line changed differently on both sides
/// emits a marker block and fails the merge.
#[must_use]
pub fn merge(conflict: &SyncConflict) -> MergeResult {
    let base: Vec<&str> = conflict.base_content.split('\n').collect();
    let local: Vec<&str> = conflict.local_content.split('\n').collect();
    let remote: Vec<&str> = conflict.remote_content.split('\n').collect();

    let len = base.len().max(local.len()).max(remote.len());
    let mut merged: Vec<String> = Vec::with_capacity(len);
    let mut has_conflicts = false;

    for i in 0..len {
        let base_line = base.get(i).copied().unwrap_or("");
        let local_line = local.get(i).copied().unwrap_or("");
        let remote_line = remote.get(i).copied().unwrap_or("");

        if local_line == remote_line {
            merged.push(local_line.to_string());
        } else if local_line == base_line {
            merged.push(remote_line.to_string());
        } else if remote_line == base_line {
            merged.push(local_line.to_string());
        } else {
            has_conflicts = true;
            merged.push(LOCAL_MARKER.to_string());
            merged.push(local_line.to_string());
            merged.push(SEPARATOR_MARKER.to_string());
            merged.push(remote_line.to_string());
            merged.push(REMOTE_MARKER.to_string());
        }
    }

    let joined = merged.join("\n");
    if has_conflicts {
        MergeResult {
            success: false,
            content: None,
            has_conflicts: true,
            conflict_markers: Some(joined),
        }
    } else {
        MergeResult {
            success: true,
            content: Some(joined),
            has_conflicts: false,
            conflict_markers: None,
        }
    }
}

/// Apply a resolution to the local cache.
///
/// The remote state the conflict was detected against becomes the entry's
/// new base (content + token), and the chosen content is layered on top
/// as a fresh dirty edit. Nothing is pushed; the caller runs push/sync
/// afterward to commit the resolution.
pub fn resolve_conflict(
    cache: &mut FileCache,
    source: &str,
    conflict: &SyncConflict,
    resolution: &Resolution,
) {
    let resolved = match resolution {
        Resolution::Local => conflict.local_content.clone(),
        Resolution::Remote => conflict.remote_content.clone(),
        Resolution::Merged(content) => content.clone(),
    };

    cache.commit_push(
        source,
        &conflict.path,
        conflict.remote_content.clone(),
        conflict.remote_token.clone(),
    );
    cache.write_file_locally(source, &conflict.path, resolved);
}
