use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json};
use crate::config::{GithubConfig, SourceConfig};
use crate::error::{Result, SyncError};

#[derive(Args, Debug)]
pub struct SourceArgs {
    #[command(subcommand)]
    pub command: SourceCommand,
}

#[derive(Subcommand, Debug)]
pub enum SourceCommand {
    /// List configured sources
    List,
    /// Add or replace a source
    Add(SourceAddArgs),
    /// Remove a source
    Remove(SourceRemoveArgs),
    /// Set the active source
    Use(SourceUseArgs),
}

#[derive(Args, Debug)]
pub struct SourceAddArgs {
    /// Source identifier, e.g. "work"
    pub id: String,

    /// Repository owner (user or organization)
    #[arg(long)]
    pub owner: String,

    /// Repository name
    #[arg(long)]
    pub repo: String,

    /// Branch to sync against
    #[arg(long, default_value = "main")]
    pub branch: String,

    /// Path inside the repository holding task files
    #[arg(long, default_value = "")]
    pub root: String,

    /// Env var holding the GitHub access token
    #[arg(long, default_value = "TB_GITHUB_TOKEN")]
    pub token_env: String,

    /// Local working tree for this source
    #[arg(long)]
    pub workdir: PathBuf,

    /// Display name
    #[arg(long)]
    pub name: Option<String>,

    /// Never push to this source
    #[arg(long)]
    pub read_only: bool,

    /// Make this the active source
    #[arg(long)]
    pub use_now: bool,
}

#[derive(Args, Debug)]
pub struct SourceRemoveArgs {
    pub id: String,
}

#[derive(Args, Debug)]
pub struct SourceUseArgs {
    pub id: String,
}

pub fn run(ctx: &AppContext, args: &SourceArgs) -> Result<()> {
    match &args.command {
        SourceCommand::List => list(ctx),
        SourceCommand::Add(args) => add(ctx, args),
        SourceCommand::Remove(args) => remove(ctx, args),
        SourceCommand::Use(args) => use_source(ctx, args),
    }
}

fn list(ctx: &AppContext) -> Result<()> {
    if ctx.machine {
        return emit_json(&serde_json::json!({
            "status": "ok",
            "active": ctx.config.active,
            "sources": ctx.config.sources.iter().map(|s| serde_json::json!({
                "id": s.id,
                "repo": format!("{}/{}", s.github.owner, s.github.repo),
                "branch": s.github.branch,
                "workdir": s.workdir,
                "readOnly": s.read_only,
            })).collect::<Vec<_>>(),
        }));
    }

    let mut layout = HumanLayout::new();
    layout.title("Sources");
    if ctx.config.sources.is_empty() {
        layout.line("  None configured. Add one with `tb source add`.");
    }
    for source in &ctx.config.sources {
        let active = if ctx.config.active.as_deref() == Some(&source.id) {
            " (active)"
        } else {
            ""
        };
        layout.bullet(&format!(
            "{}{active} — {}/{} @ {}",
            source.id, source.github.owner, source.github.repo, source.github.branch
        ));
    }
    emit_human(layout);
    Ok(())
}

fn add(ctx: &AppContext, args: &SourceAddArgs) -> Result<()> {
    let mut config = ctx.config.clone();
    config.upsert_source(SourceConfig {
        id: args.id.clone(),
        name: args.name.clone(),
        github: GithubConfig {
            owner: args.owner.clone(),
            repo: args.repo.clone(),
            branch: args.branch.clone(),
            root: args.root.clone(),
            token_env: args.token_env.clone(),
        },
        workdir: args.workdir.clone(),
        read_only: args.read_only,
    });
    if args.use_now || config.active.is_none() {
        config.active = Some(args.id.clone());
    }
    config.save_to(&ctx.config_path)?;

    if ctx.machine {
        return emit_json(&serde_json::json!({ "status": "ok", "id": args.id }));
    }
    let mut layout = HumanLayout::new();
    layout
        .title("Source added")
        .kv("Id", &args.id)
        .kv("Repository", &format!("{}/{}", args.owner, args.repo));
    emit_human(layout);
    Ok(())
}

fn remove(ctx: &AppContext, args: &SourceRemoveArgs) -> Result<()> {
    let mut config = ctx.config.clone();
    if !config.remove_source(&args.id) {
        return Err(SyncError::Config(format!("unknown source: {}", args.id)));
    }
    config.save_to(&ctx.config_path)?;

    if ctx.machine {
        return emit_json(&serde_json::json!({ "status": "ok", "removed": args.id }));
    }
    let mut layout = HumanLayout::new();
    layout.title(&format!("Removed source {}", args.id));
    emit_human(layout);
    Ok(())
}

fn use_source(ctx: &AppContext, args: &SourceUseArgs) -> Result<()> {
    let mut config = ctx.config.clone();
    if config.source(&args.id).is_none() {
        return Err(SyncError::Config(format!("unknown source: {}", args.id)));
    }
    config.active = Some(args.id.clone());
    config.save_to(&ctx.config_path)?;

    if ctx.machine {
        return emit_json(&serde_json::json!({ "status": "ok", "active": args.id }));
    }
    let mut layout = HumanLayout::new();
    layout.title(&format!("Active source is now {}", args.id));
    emit_human(layout);
    Ok(())
}
