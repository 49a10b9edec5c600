use clap::{Args, Subcommand};

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json};
use crate::error::{Result, SyncError};
use crate::sync::SyncEngine;
use crate::task::{self, Task, TaskStatus};
use crate::workspace::Workspace;

#[derive(Args, Debug)]
pub struct TasksArgs {
    #[command(subcommand)]
    pub command: Option<TasksCommand>,
}

#[derive(Subcommand, Debug)]
pub enum TasksCommand {
    /// List tasks in the working tree (default)
    List(TasksListArgs),
    /// Delete a task on the remote and locally
    Rm(TasksRmArgs),
}

#[derive(Args, Debug, Default)]
pub struct TasksListArgs {
    /// Source to list (defaults to the active source)
    #[arg(long)]
    pub source: Option<String>,

    /// Only show tasks in this status column
    #[arg(long)]
    pub status: Option<String>,
}

#[derive(Args, Debug)]
pub struct TasksRmArgs {
    /// Task file path, relative to the source root
    pub path: String,

    /// Source to delete from (defaults to the active source)
    #[arg(long)]
    pub source: Option<String>,

    /// Commit message for the remote delete
    #[arg(long, short = 'M')]
    pub message: Option<String>,
}

pub fn run(ctx: &AppContext, args: &TasksArgs) -> Result<()> {
    match &args.command {
        Some(TasksCommand::List(args)) => list(ctx, args),
        Some(TasksCommand::Rm(args)) => rm(ctx, args),
        None => list(ctx, &TasksListArgs::default()),
    }
}

fn parse_status(raw: &str) -> Result<TaskStatus> {
    match raw {
        "backlog" => Ok(TaskStatus::Backlog),
        "todo" => Ok(TaskStatus::Todo),
        "in-progress" | "doing" => Ok(TaskStatus::InProgress),
        "done" => Ok(TaskStatus::Done),
        "archived" => Ok(TaskStatus::Archived),
        _ => Err(SyncError::Config(format!(
            "unknown status: {raw} (use backlog|todo|in-progress|done|archived)"
        ))),
    }
}

fn list(ctx: &AppContext, args: &TasksListArgs) -> Result<()> {
    let source = ctx.resolve_source(args.source.as_deref())?;
    let workspace = Workspace::open(&source.workdir)?;
    let filter = args.status.as_deref().map(parse_status).transpose()?;

    let mut tasks: Vec<Task> = Vec::new();
    let mut invalid: Vec<String> = Vec::new();
    for (path, content) in workspace.scan()? {
        match task::parse(&content, &path) {
            Ok(parsed) => {
                if filter.is_none_or(|status| parsed.status == status) {
                    tasks.push(parsed);
                }
            }
            Err(err) => invalid.push(format!("{path}: {err}")),
        }
    }
    tasks.sort_by(|a, b| (a.status, a.id.clone()).cmp(&(b.status, b.id.clone())));

    if ctx.machine {
        return emit_json(&serde_json::json!({
            "status": "ok",
            "source": source.id,
            "tasks": tasks.iter().map(|t| serde_json::json!({
                "id": t.id,
                "title": t.title,
                "status": t.status.to_string(),
                "priority": t.priority,
                "labels": t.labels,
                "path": t.path,
            })).collect::<Vec<_>>(),
            "invalid": invalid,
        }));
    }

    let mut layout = HumanLayout::new();
    layout.title(&format!("Tasks in {}", source.id));
    if tasks.is_empty() {
        layout.line("  No tasks found.");
    }
    let mut current: Option<TaskStatus> = None;
    for t in &tasks {
        if current != Some(t.status) {
            layout.blank().line(&format!("[{}]", t.status));
            current = Some(t.status);
        }
        layout.bullet(&format!("{} — {} ({})", t.id, t.title, t.path));
    }
    for warning in &invalid {
        layout.warn(warning);
    }
    emit_human(layout);
    Ok(())
}

fn rm(ctx: &AppContext, args: &TasksRmArgs) -> Result<()> {
    let source = ctx.resolve_source(args.source.as_deref())?;
    if source.read_only {
        return Err(SyncError::Config(format!(
            "source {} is read-only",
            source.id
        )));
    }
    let remote = AppContext::remote(source)?;
    let mut workspace = Workspace::open(&source.workdir)?;

    let mut cache = ctx.cache();
    workspace.seed_cache(&source.id, &mut cache)?;
    let message = ctx.commit_message(args.message.as_deref());

    SyncEngine::new(&source.id, &remote, &mut cache).delete(&args.path, &message)?;
    workspace.remove(&args.path)?;

    if ctx.machine {
        return emit_json(&serde_json::json!({ "status": "ok", "deleted": args.path }));
    }
    let mut layout = HumanLayout::new();
    layout.title(&format!("Deleted {}", args.path));
    emit_human(layout);
    Ok(())
}
