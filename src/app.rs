//! Application context shared by CLI commands.

use std::path::PathBuf;

use crate::cache::FileCache;
use crate::cli::Cli;
use crate::config::{Config, SourceConfig};
use crate::error::Result;
use crate::remote::GithubRemote;

/// Loaded configuration plus the global flags commands care about.
pub struct AppContext {
    pub config: Config,
    pub config_path: PathBuf,
    pub machine: bool,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config_path = match &cli.config {
            Some(path) => path.clone(),
            None => Config::path()?,
        };
        let config = Config::load_from(&config_path)?;
        Ok(Self {
            config,
            config_path,
            machine: cli.machine,
        })
    }

    /// The source a command acts on: explicit id or the active source.
    pub fn resolve_source(&self, id: Option<&str>) -> Result<&SourceConfig> {
        self.config.resolve_source(id)
    }

    /// A GitHub client for one configured source.
    pub fn remote(source: &SourceConfig) -> Result<GithubRemote> {
        GithubRemote::new(&source.github)
    }

    /// A fresh cache honoring the configured TTL.
    #[must_use]
    pub fn cache(&self) -> FileCache {
        FileCache::with_ttl_minutes(self.config.settings.cache_ttl_minutes)
    }

    /// Commit message for a push: the explicit one or the configured
    /// default.
    #[must_use]
    pub fn commit_message(&self, explicit: Option<&str>) -> String {
        explicit
            .map(String::from)
            .unwrap_or_else(|| self.config.settings.commit_message.clone())
    }

    pub fn save_config(&self) -> Result<()> {
        self.config.save_to(&self.config_path)
    }
}
