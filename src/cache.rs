//! Per-source file cache with dirty tracking.
//!
//! The cache mediates every read and local write of remote-backed task
//! files: repeated reads within the TTL do not re-fetch, and local edits
//! are held as dirty entries that survive listing refreshes until a push
//! commits them. All mutation of cache entries goes through methods on
//! [`FileCache`] so the dirty invariant (`dirty` ⟺ `local_content` is
//! present) holds everywhere.
//!
//! The cache is purely in-memory; nothing here survives the process.
//! Durability of unsaved edits is a caller concern (see `workspace`).

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::error::Result;
use crate::remote::{RemoteFile, RemoteStore, Token};

/// Default freshness window for cached reads.
pub const DEFAULT_TTL_MINUTES: i64 = 5;

/// One cached file within a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFile {
    pub path: String,
    /// Last known remote content; empty if only a listing entry exists.
    pub content: String,
    /// Remote version `content` corresponds to.
    pub token: Token,
    pub cached_at: DateTime<Utc>,
    pub dirty: bool,
    /// Local edit not yet pushed; present iff `dirty`.
    pub local_content: Option<String>,
}

impl CachedFile {
    /// Content a reader should see: the local edit when dirty, the cached
    /// remote content otherwise.
    #[must_use]
    pub fn effective_content(&self) -> &str {
        match &self.local_content {
            Some(local) => local,
            None => &self.content,
        }
    }
}

/// Cache for a single configured source.
#[derive(Debug, Default)]
struct SourceCache {
    files: HashMap<String, CachedFile>,
    last_refresh: Option<DateTime<Utc>>,
}

/// In-memory cache over all remote-backed sources, keyed by source id.
///
/// Sources are created lazily on first access and live until explicitly
/// invalidated. The sync engine borrows this mutably for the duration of
/// an operation, which is also what keeps concurrent same-source syncs
/// unrepresentable.
#[derive(Debug)]
pub struct FileCache {
    sources: HashMap<String, SourceCache>,
    ttl: Duration,
}

impl Default for FileCache {
    fn default() -> Self {
        Self::new()
    }
}

impl FileCache {
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl_minutes(DEFAULT_TTL_MINUTES)
    }

    #[must_use]
    pub fn with_ttl_minutes(minutes: i64) -> Self {
        Self {
            sources: HashMap::new(),
            ttl: Duration::minutes(minutes),
        }
    }

    fn source_mut(&mut self, source: &str) -> &mut SourceCache {
        self.sources.entry(source.to_string()).or_default()
    }

    /// Look up a cached entry without touching the remote.
    #[must_use]
    pub fn get(&self, source: &str, path: &str) -> Option<&CachedFile> {
        self.sources.get(source).and_then(|s| s.files.get(path))
    }

    /// True when the entry exists and carries an unpushed local edit.
    #[must_use]
    pub fn is_dirty(&self, source: &str, path: &str) -> bool {
        self.get(source, path).is_some_and(|entry| entry.dirty)
    }

    /// Timestamp of the last `refresh` for a source, if any.
    #[must_use]
    pub fn last_refresh(&self, source: &str) -> Option<DateTime<Utc>> {
        self.sources.get(source).and_then(|s| s.last_refresh)
    }

    /// Read a file through the cache.
    ///
    /// Dirty entries always serve the local edit. Clean entries within the
    /// TTL serve the cached content. Anything else is fetched from the
    /// remote and stored as a fresh non-dirty entry.
    pub fn read_file(
        &mut self,
        source: &str,
        path: &str,
        remote: &dyn RemoteStore,
    ) -> Result<String> {
        let ttl = self.ttl;
        if let Some(entry) = self.source_mut(source).files.get(path) {
            if entry.dirty {
                return Ok(entry.effective_content().to_string());
            }
            if Utc::now() - entry.cached_at < ttl {
                return Ok(entry.content.clone());
            }
        }

        debug!(source, path, "Cache miss, fetching from remote");
        let fetched = remote.get_file(path)?;
        let entry = CachedFile {
            path: path.to_string(),
            content: fetched.content.clone(),
            token: fetched.token,
            cached_at: Utc::now(),
            dirty: false,
            local_content: None,
        };
        self.source_mut(source).files.insert(path.to_string(), entry);
        Ok(fetched.content)
    }

    /// Record a local edit. Never touches the remote.
    ///
    /// A previously unknown path becomes a new dirty entry with empty
    /// remote content and `Token::None`, which the engine reads as
    /// "create" rather than "update".
    pub fn write_file_locally(&mut self, source: &str, path: &str, content: impl Into<String>) {
        let content = content.into();
        let entry = self
            .source_mut(source)
            .files
            .entry(path.to_string())
            .or_insert_with(|| CachedFile {
                path: path.to_string(),
                content: String::new(),
                token: Token::None,
                cached_at: Utc::now(),
                dirty: false,
                local_content: None,
            });
        entry.dirty = true;
        entry.local_content = Some(content);
    }

    /// All entries with unpushed local edits, in path order.
    #[must_use]
    pub fn list_dirty_files(&self, source: &str) -> Vec<CachedFile> {
        let mut dirty: Vec<CachedFile> = self
            .sources
            .get(source)
            .map(|s| s.files.values().filter(|f| f.dirty).cloned().collect())
            .unwrap_or_default();
        dirty.sort_by(|a, b| a.path.cmp(&b.path));
        dirty
    }

    #[must_use]
    pub fn has_unsaved_changes(&self, source: &str) -> bool {
        self.sources
            .get(source)
            .is_some_and(|s| s.files.values().any(|f| f.dirty))
    }

    /// Commit a successful remote write: the written content becomes the
    /// new base, the dirty flag clears, and the entry is fresh again.
    ///
    /// Also used when a conflict resolution absorbs an observed remote
    /// state as the new base before re-marking the entry dirty.
    pub fn commit_push(
        &mut self,
        source: &str,
        path: &str,
        new_content: impl Into<String>,
        new_token: Token,
    ) {
        let entry = self
            .source_mut(source)
            .files
            .entry(path.to_string())
            .or_insert_with(|| CachedFile {
                path: path.to_string(),
                content: String::new(),
                token: Token::None,
                cached_at: Utc::now(),
                dirty: false,
                local_content: None,
            });
        entry.content = new_content.into();
        entry.token = new_token;
        entry.cached_at = Utc::now();
        entry.dirty = false;
        entry.local_content = None;
    }

    /// Drop the entire cache for a source, dirty entries included.
    ///
    /// Destructive: the caller must have reconciled dirty state first.
    /// A listing refresh that must preserve edits is `refresh`, not this.
    pub fn invalidate(&mut self, source: &str) {
        self.sources.remove(source);
    }

    /// Drop a single entry (after a remote delete).
    pub fn remove(&mut self, source: &str, path: &str) {
        if let Some(cache) = self.sources.get_mut(source) {
            cache.files.remove(path);
        }
    }

    /// Reconcile the cache with a fresh remote listing.
    ///
    /// Dirty entries are preserved untouched. Every other listed path is
    /// reset to an empty placeholder holding the listing's token with
    /// `cached_at` at the epoch, so the next read re-fetches. Clean
    /// entries absent from the listing are dropped.
    pub fn refresh(&mut self, source: &str, listing: &[RemoteFile]) {
        let cache = self.source_mut(source);

        cache.files.retain(|path, entry| {
            entry.dirty || listing.iter().any(|f| &f.path == path)
        });

        for file in listing {
            if cache.files.get(&file.path).is_some_and(|e| e.dirty) {
                continue;
            }
            cache.files.insert(
                file.path.clone(),
                CachedFile {
                    path: file.path.clone(),
                    content: String::new(),
                    token: file.token.clone(),
                    cached_at: DateTime::UNIX_EPOCH,
                    dirty: false,
                    local_content: None,
                },
            );
        }
        cache.last_refresh = Some(Utc::now());
    }
}
