//! Task markdown codec.
//!
//! A task file is YAML frontmatter between `---` fences followed by a
//! free-form markdown body. The sync cache stores raw strings; this codec
//! is applied by the layer above (task listings, frontmatter patches),
//! never by the cache itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// Board column a task lives in. Ordered the way columns appear on a
/// board, so sorting tasks by status groups them left to right.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Backlog,
    #[default]
    Todo,
    InProgress,
    Done,
    Archived,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Backlog => "backlog",
            Self::Todo => "todo",
            Self::InProgress => "in-progress",
            Self::Done => "done",
            Self::Archived => "archived",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

/// One task: frontmatter fields plus the markdown body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Markdown body below the frontmatter.
    #[serde(skip)]
    pub body: String,
    /// Source-relative path of the file this task was parsed from.
    #[serde(skip)]
    pub path: String,
}

/// Partial frontmatter update. `None` fields are left untouched; unknown
/// frontmatter keys in the file always survive.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub labels: Option<Vec<String>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Split a raw task file into (frontmatter yaml, raw body after the
/// closing fence).
fn split_frontmatter(raw: &str) -> Result<(&str, &str)> {
    let rest = raw
        .strip_prefix("---\n")
        .ok_or_else(|| SyncError::InvalidTask("missing frontmatter opening fence".to_string()))?;

    if let Some(idx) = rest.find("\n---\n") {
        Ok((&rest[..idx + 1], &rest[idx + 5..]))
    } else if let Some(yaml) = rest.strip_suffix("\n---") {
        Ok((yaml, ""))
    } else {
        Err(SyncError::InvalidTask(
            "missing frontmatter closing fence".to_string(),
        ))
    }
}

/// Parse a raw task file.
pub fn parse(raw: &str, path: &str) -> Result<Task> {
    let (yaml, body) = split_frontmatter(raw)?;
    let mut task: Task = serde_yaml::from_str(yaml)
        .map_err(|e| SyncError::InvalidTask(format!("{path}: {e}")))?;
    task.body = body.strip_prefix('\n').unwrap_or(body).to_string();
    task.path = path.to_string();
    Ok(task)
}

/// Render a task back to its file form.
pub fn generate(task: &Task) -> Result<String> {
    let yaml = serde_yaml::to_string(task)?;
    if task.body.is_empty() {
        Ok(format!("---\n{yaml}---\n"))
    } else {
        Ok(format!("---\n{yaml}---\n\n{}", task.body))
    }
}

/// Apply a partial update to a file's frontmatter.
///
/// Works on the YAML mapping rather than a `Task`, so keys this codec
/// does not model pass through, and the body is preserved byte-for-byte.
pub fn update_frontmatter(raw: &str, patch: &TaskPatch) -> Result<String> {
    let (yaml, body) = split_frontmatter(raw)?;
    let mut mapping: serde_yaml::Mapping = serde_yaml::from_str(yaml)
        .map_err(|e| SyncError::InvalidTask(format!("frontmatter is not a mapping: {e}")))?;

    if let Some(title) = &patch.title {
        mapping.insert("title".into(), serde_yaml::Value::String(title.clone()));
    }
    if let Some(status) = patch.status {
        mapping.insert("status".into(), serde_yaml::to_value(status)?);
    }
    if let Some(priority) = patch.priority {
        mapping.insert("priority".into(), serde_yaml::to_value(priority)?);
    }
    if let Some(labels) = &patch.labels {
        mapping.insert("labels".into(), serde_yaml::to_value(labels)?);
    }
    if let Some(updated_at) = patch.updated_at {
        mapping.insert("updated_at".into(), serde_yaml::to_value(updated_at)?);
    }

    let rendered = serde_yaml::to_string(&mapping)?;
    Ok(format!("---\n{rendered}---\n{body}"))
}
