//! Local working tree for a remote-backed source.
//!
//! The sync cache is in-memory by design, so a short-lived CLI process
//! needs somewhere to keep "what the remote looked like when we last
//! synced". A workspace is a directory of task files plus a `.tb/`
//! shadow: `state.json` maps each path to its last-synced integrity
//! token and `base/` holds the matching ancestor copies. On startup the
//! workspace seeds a [`FileCache`] (clean entries for unchanged files,
//! dirty entries for files whose working content differs from base) and
//! after an engine run it writes pulled and pushed state back out.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::WalkDir;

use crate::cache::FileCache;
use crate::error::{Result, SyncError};
use crate::remote::Token;
use crate::sync::SyncReport;

const STATE_DIR: &str = ".tb";
const BASE_DIR: &str = "base";
const STATE_FILE: &str = "state.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct WorkspaceState {
    /// Last-synced integrity token per path.
    #[serde(default)]
    files: BTreeMap<String, Token>,
}

/// Working tree plus persisted last-synced state for one source.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    state: WorkspaceState,
}

impl Workspace {
    /// Open (creating if needed) the workspace at `root`.
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root.join(STATE_DIR).join(BASE_DIR))?;
        let state_path = root.join(STATE_DIR).join(STATE_FILE);
        let state = if state_path.exists() {
            let contents = fs::read_to_string(&state_path)?;
            serde_json::from_str(&contents)?
        } else {
            WorkspaceState::default()
        };
        Ok(Self {
            root: root.to_path_buf(),
            state,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn save_state(&self) -> Result<()> {
        let rendered = serde_json::to_string_pretty(&self.state)?;
        fs::write(self.root.join(STATE_DIR).join(STATE_FILE), rendered)?;
        Ok(())
    }

    fn working_path(&self, path: &str) -> Result<PathBuf> {
        validate_rel_path(path)?;
        Ok(self.root.join(path))
    }

    fn base_path(&self, path: &str) -> Result<PathBuf> {
        validate_rel_path(path)?;
        Ok(self.root.join(STATE_DIR).join(BASE_DIR).join(path))
    }

    /// All task files in the working tree, as (relative path, content).
    pub fn scan(&self) -> Result<Vec<(String, String)>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| e.file_name() != STATE_DIR)
        {
            let entry =
                entry.map_err(|e| SyncError::Workspace(format!("scan {}: {e}", self.root.display())))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let rel = path
                .strip_prefix(&self.root)
                .map_err(|_| SyncError::Workspace(format!("path escapes root: {}", path.display())))?
                .to_string_lossy()
                .replace('\\', "/");
            let content = fs::read_to_string(path)?;
            files.push((rel, content));
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }

    fn base_content(&self, path: &str) -> Result<Option<String>> {
        let base = self.base_path(path)?;
        if base.exists() {
            Ok(Some(fs::read_to_string(base)?))
        } else {
            Ok(None)
        }
    }

    /// Paths whose working content differs from their recorded base,
    /// including files never synced at all.
    pub fn dirty_files(&self) -> Result<Vec<String>> {
        let mut dirty = Vec::new();
        for (path, content) in self.scan()? {
            match self.base_content(&path)? {
                Some(base) if base == content => {}
                _ => dirty.push(path),
            }
        }
        Ok(dirty)
    }

    /// Seed an in-memory cache from the working tree: unchanged files
    /// become clean entries (base + token), edited or new files become
    /// dirty entries layered on their recorded base.
    pub fn seed_cache(&self, source: &str, cache: &mut FileCache) -> Result<Vec<String>> {
        let mut dirty = Vec::new();
        for (path, content) in self.scan()? {
            let token = self.state.files.get(&path).cloned().unwrap_or(Token::None);
            let base = self.base_content(&path)?;

            match base {
                Some(base) if !token.is_none() => {
                    cache.commit_push(source, &path, base.clone(), token);
                    if base != content {
                        cache.write_file_locally(source, &path, content);
                        dirty.push(path);
                    }
                }
                _ => {
                    // Never synced: a new local file about to be created.
                    cache.write_file_locally(source, &path, content);
                    dirty.push(path);
                }
            }
        }
        debug!(source, dirty = dirty.len(), "Workspace seeded cache");
        Ok(dirty)
    }

    /// Record one path's synced state: working file, base copy, token.
    pub fn record_synced(&mut self, path: &str, content: &str, token: &Token) -> Result<()> {
        let working = self.working_path(path)?;
        if let Some(parent) = working.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&working, content)?;

        let base = self.base_path(path)?;
        if let Some(parent) = base.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&base, content)?;

        self.state.files.insert(path.to_string(), token.clone());
        self.save_state()
    }

    /// Write the outcome of an engine run back to disk: every pulled or
    /// pushed path's cache entry becomes the new working + base state,
    /// and tracked paths that dropped out of the cache (deleted remotely,
    /// unedited locally) are pruned from the working tree.
    pub fn apply_report(
        &mut self,
        source: &str,
        cache: &FileCache,
        report: &SyncReport,
    ) -> Result<()> {
        for path in report.pulled.iter().chain(report.pushed.iter()) {
            let Some(entry) = cache.get(source, path) else {
                continue;
            };
            self.record_synced(path, &entry.content, &entry.token)?;
        }

        let tracked: Vec<String> = self.state.files.keys().cloned().collect();
        for path in tracked {
            if cache.get(source, &path).is_some() {
                continue;
            }
            // Gone from the cache means the listing no longer has it and
            // no local edit was protecting it.
            let working = self.working_path(&path)?;
            let unedited = match (fs::read_to_string(&working), self.base_content(&path)?) {
                (Ok(content), Some(base)) => content == base,
                (Err(_), _) => true,
                _ => false,
            };
            if unedited {
                debug!(source, path, "Pruning remotely deleted file");
                self.remove(&path)?;
            }
        }
        Ok(())
    }

    /// Record only the base side of a path: ancestor copy + token,
    /// leaving the working file alone. Conflict resolution uses this to
    /// rebase a path onto an observed remote state while the working
    /// file holds the resolved content.
    pub fn record_base(&mut self, path: &str, base_content: &str, token: &Token) -> Result<()> {
        let base = self.base_path(path)?;
        if let Some(parent) = base.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&base, base_content)?;
        self.state.files.insert(path.to_string(), token.clone());
        self.save_state()
    }

    /// Overwrite the working file only.
    pub fn write_working(&self, path: &str, content: &str) -> Result<()> {
        let working = self.working_path(path)?;
        if let Some(parent) = working.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(working, content)?;
        Ok(())
    }

    /// Forget a path entirely (after a remote delete).
    pub fn remove(&mut self, path: &str) -> Result<()> {
        let working = self.working_path(path)?;
        if working.exists() {
            fs::remove_file(working)?;
        }
        let base = self.base_path(path)?;
        if base.exists() {
            fs::remove_file(base)?;
        }
        self.state.files.remove(path);
        self.save_state()
    }

    /// Last-synced token for a path, if the path has ever been synced.
    #[must_use]
    pub fn token(&self, path: &str) -> Option<&Token> {
        self.state.files.get(path)
    }
}

fn validate_rel_path(path: &str) -> Result<()> {
    if path.is_empty()
        || path.starts_with('/')
        || path.split('/').any(|seg| seg == ".." || seg.is_empty())
    {
        return Err(SyncError::Workspace(format!("unsafe path: {path}")));
    }
    Ok(())
}
