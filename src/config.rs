use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// GitHub coordinates for one remote-backed source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GithubConfig {
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Path inside the repository under which task files live.
    #[serde(default)]
    pub root: String,
    /// Environment variable holding the access token. The token itself is
    /// never written to disk.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_token_env() -> String {
    "TB_GITHUB_TOKEN".to_string()
}

/// One configured source of task files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub github: GithubConfig,
    /// Local working tree for this source's task files.
    pub workdir: PathBuf,
    #[serde(default)]
    pub read_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_ttl_minutes")]
    pub cache_ttl_minutes: i64,
    #[serde(default = "default_commit_message")]
    pub commit_message: String,
}

fn default_ttl_minutes() -> i64 {
    crate::cache::DEFAULT_TTL_MINUTES
}

fn default_commit_message() -> String {
    "Update tasks".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_ttl_minutes: default_ttl_minutes(),
            commit_message: default_commit_message(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    /// Id of the source commands act on when none is given.
    #[serde(default)]
    pub active: Option<String>,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| SyncError::MissingConfig("config directory not found".to_string()))?;
        Ok(base.join("tb").join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|err| SyncError::Config(format!("read config {}: {err}", path.display())))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|err| SyncError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| SyncError::Config(format!("create config dir: {err}")))?;
        }
        let rendered = toml::to_string_pretty(self)
            .map_err(|err| SyncError::Config(format!("render config: {err}")))?;
        std::fs::write(path, rendered)
            .map_err(|err| SyncError::Config(format!("write config {}: {err}", path.display())))?;
        Ok(())
    }

    pub fn upsert_source(&mut self, source: SourceConfig) {
        if let Some(existing) = self.sources.iter_mut().find(|s| s.id == source.id) {
            *existing = source;
        } else {
            self.sources.push(source);
        }
    }

    pub fn remove_source(&mut self, id: &str) -> bool {
        let before = self.sources.len();
        self.sources.retain(|s| s.id != id);
        if self.active.as_deref() == Some(id) {
            self.active = None;
        }
        before != self.sources.len()
    }

    #[must_use]
    pub fn source(&self, id: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// The source a command should act on: an explicit id, or the
    /// configured active source.
    pub fn resolve_source(&self, id: Option<&str>) -> Result<&SourceConfig> {
        let id = id
            .or(self.active.as_deref())
            .ok_or_else(|| {
                SyncError::MissingConfig(
                    "no source given and no active source configured".to_string(),
                )
            })?;
        self.source(id)
            .ok_or_else(|| SyncError::Config(format!("unknown source: {id}")))
    }
}
