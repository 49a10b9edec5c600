//! GitHub contents API client.
//!
//! Implements [`RemoteStore`] over the GitHub REST API: the git trees API
//! for recursive listings and the contents API for reads, writes, and
//! deletes. Blob SHAs serve as integrity tokens; writes carry the expected
//! SHA so the server rejects stale updates.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::blocking::Response;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::GithubConfig;
use crate::error::{Result, SyncError};

use super::{RemoteContent, RemoteFile, RemoteStore, Token};

/// Default GitHub REST API base URL.
pub const GITHUB_API_BASE_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";

/// Retry configuration for read requests.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            jitter_factor: 0.25,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GitTreeResponse {
    tree: Vec<GitTreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct GitTreeEntry {
    path: String,
    sha: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    content: Option<WrittenContent>,
}

#[derive(Debug, Deserialize)]
struct WrittenContent {
    sha: String,
}

#[derive(Debug, Serialize)]
struct PutBody<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct DeleteBody<'a> {
    message: &'a str,
    sha: &'a str,
    branch: &'a str,
}

/// GitHub-backed remote store for one configured source.
pub struct GithubRemote {
    base_url: String,
    owner: String,
    repo: String,
    branch: String,
    root: String,
    token: String,
    retry_config: RetryConfig,
    http_client: reqwest::blocking::Client,
}

impl GithubRemote {
    /// Build a client for a configured source, reading the access token
    /// from the source's `token_env` environment variable.
    pub fn new(config: &GithubConfig) -> Result<Self> {
        let token = std::env::var(&config.token_env).map_err(|_| {
            SyncError::MissingConfig(format!(
                "GitHub access token; set the {} env var",
                config.token_env
            ))
        })?;
        Self::with_base_url(config, &token, GITHUB_API_BASE_URL)
    }

    /// Build a client against an explicit API base URL. Tests point this at
    /// a local mock server.
    pub fn with_base_url(config: &GithubConfig, token: &str, base_url: &str) -> Result<Self> {
        let http_client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SyncError::Config(format!("HTTP client error: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            branch: config.branch.clone(),
            root: config.root.trim_matches('/').to_string(),
            token: token.to_string(),
            retry_config: RetryConfig::default(),
            http_client,
        })
    }

    /// Repo-root path for a task path relative to the configured root.
    fn full_path(&self, path: &str) -> String {
        if self.root.is_empty() {
            path.to_string()
        } else {
            format!("{}/{path}", self.root)
        }
    }

    fn contents_url(&self, path: &str) -> String {
        let encoded: Vec<String> = self
            .full_path(path)
            .split('/')
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect();
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.base_url,
            self.owner,
            self.repo,
            encoded.join("/")
        )
    }

    fn trees_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/git/trees/{}?recursive=1",
            self.base_url,
            self.owner,
            self.repo,
            urlencoding::encode(&self.branch)
        )
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::blocking::RequestBuilder {
        self.http_client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("X-Request-ID", format!("tb-{}", Uuid::new_v4()))
            .header("User-Agent", concat!("tb/", env!("CARGO_PKG_VERSION")))
    }

    /// GET with retry for transient failures. Mutating requests never go
    /// through this path.
    fn get_with_retry(&self, url: &str) -> Result<Response> {
        let mut last_error = None;

        for attempt in 0..=self.retry_config.max_retries {
            if attempt > 0 {
                let delay = self.calculate_delay(attempt);
                debug!(attempt, delay_ms = delay.as_millis(), url, "Retrying request");
                std::thread::sleep(delay);
            }

            match self.request(reqwest::Method::GET, url).send() {
                Ok(response) if response.status().is_server_error() => {
                    warn!(status = %response.status(), url, "Server error, will retry");
                    last_error = Some(SyncError::RemoteUnavailable(format!(
                        "GitHub returned {} for {url}",
                        response.status()
                    )));
                }
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!(attempt, error = %e, url, "Request failed");
                    last_error = Some(SyncError::RemoteUnavailable(format!(
                        "HTTP request failed: {e}"
                    )));
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| SyncError::RemoteUnavailable("request never attempted".to_string())))
    }

    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base = self.retry_config.base_delay_ms as f64;
        let exp_delay = base * 2_f64.powi(attempt as i32);
        let capped = exp_delay.min(self.retry_config.max_delay_ms as f64);

        let jitter_range = capped * self.retry_config.jitter_factor;
        let jitter = (rand::random::<f64>() - 0.5) * 2.0 * jitter_range;
        let final_delay = (capped + jitter).max(0.0);

        Duration::from_millis(final_delay as u64)
    }

    /// Map a non-success response onto the error taxonomy.
    fn map_error(path: &str, response: Response) -> SyncError {
        let status = response.status();
        let rate_limit_exhausted = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "0");
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let body = response.text().unwrap_or_default();
        let detail = extract_api_message(&body).unwrap_or(body);

        match status.as_u16() {
            404 => SyncError::NotFound(path.to_string()),
            401 => SyncError::Unauthorized(format!(
                "GitHub rejected the access token; check your token ({detail})"
            )),
            403 if rate_limit_exhausted => SyncError::RateLimited {
                message: format!("GitHub API quota exceeded, try again later ({detail})"),
                retry_after,
            },
            429 => SyncError::RateLimited {
                message: format!("GitHub API quota exceeded, try again later ({detail})"),
                retry_after,
            },
            403 => SyncError::Unauthorized(format!("GitHub denied access to {path} ({detail})")),
            409 | 412 | 422 => SyncError::Conflict(format!("{path}: {detail}")),
            _ => SyncError::RemoteUnavailable(format!("GitHub error ({status}): {detail}")),
        }
    }
}

impl RemoteStore for GithubRemote {
    fn list_files(&self) -> Result<Vec<RemoteFile>> {
        let url = self.trees_url();
        info!(owner = %self.owner, repo = %self.repo, branch = %self.branch, "Listing task files");

        let response = self.get_with_retry(&url)?;
        if !response.status().is_success() {
            return Err(Self::map_error(&self.root, response));
        }

        let tree: GitTreeResponse = response
            .json()
            .map_err(|e| SyncError::RemoteUnavailable(format!("Invalid tree response: {e}")))?;
        if tree.truncated {
            warn!(
                owner = %self.owner,
                repo = %self.repo,
                "Tree listing truncated by GitHub; some task files may be missing"
            );
        }

        let prefix = if self.root.is_empty() {
            String::new()
        } else {
            format!("{}/", self.root)
        };

        let files: Vec<RemoteFile> = tree
            .tree
            .into_iter()
            .filter(|entry| {
                entry.kind == "blob"
                    && entry.path.ends_with(".md")
                    && entry.path.starts_with(&prefix)
            })
            .map(|entry| RemoteFile {
                path: entry.path[prefix.len()..].to_string(),
                token: Token::Known(entry.sha),
            })
            .collect();

        info!(count = files.len(), "Listing completed");
        Ok(files)
    }

    fn get_file(&self, path: &str) -> Result<RemoteContent> {
        let url = format!(
            "{}?ref={}",
            self.contents_url(path),
            urlencoding::encode(&self.branch)
        );
        debug!(path, "Fetching file");

        let response = self.get_with_retry(&url)?;
        if !response.status().is_success() {
            return Err(Self::map_error(path, response));
        }

        let contents: ContentsResponse = response
            .json()
            .map_err(|e| SyncError::RemoteUnavailable(format!("Invalid contents response: {e}")))?;

        let raw = contents.content.unwrap_or_default();
        let stripped: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = BASE64
            .decode(stripped)
            .map_err(|e| SyncError::RemoteUnavailable(format!("Invalid base64 for {path}: {e}")))?;
        let content = String::from_utf8(bytes)
            .map_err(|e| SyncError::InvalidTask(format!("{path} is not UTF-8: {e}")))?;

        Ok(RemoteContent {
            content,
            token: Token::Known(contents.sha),
        })
    }

    fn put_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
        expected: &Token,
    ) -> Result<Token> {
        let url = self.contents_url(path);
        info!(path, create = expected.is_none(), "Writing file");

        let body = PutBody {
            message,
            content: BASE64.encode(content),
            branch: &self.branch,
            sha: expected.as_known(),
        };

        let response = self
            .request(reqwest::Method::PUT, &url)
            .json(&body)
            .send()
            .map_err(|e| SyncError::RemoteUnavailable(format!("HTTP request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(Self::map_error(path, response));
        }

        let written: WriteResponse = response
            .json()
            .map_err(|e| SyncError::RemoteUnavailable(format!("Invalid write response: {e}")))?;
        written
            .content
            .map(|c| Token::Known(c.sha))
            .ok_or_else(|| {
                SyncError::RemoteUnavailable(format!("Write response for {path} had no content"))
            })
    }

    fn delete_file(&self, path: &str, message: &str, token: &Token) -> Result<()> {
        let Some(sha) = token.as_known() else {
            return Err(SyncError::Conflict(format!(
                "{path}: cannot delete a file with no known remote version"
            )));
        };

        let url = self.contents_url(path);
        info!(path, "Deleting file");

        let body = DeleteBody {
            message,
            sha,
            branch: &self.branch,
        };

        let response = self
            .request(reqwest::Method::DELETE, &url)
            .json(&body)
            .send()
            .map_err(|e| SyncError::RemoteUnavailable(format!("HTTP request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(Self::map_error(path, response));
        }
        Ok(())
    }
}

/// Pull the `message` field out of a GitHub API error body, if present.
fn extract_api_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(|m| m.as_str())
        .map(String::from)
}
