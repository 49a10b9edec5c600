use clap::{Args, Subcommand};

use crate::app::AppContext;
use crate::cache::FileCache;
use crate::cli::output::{HumanLayout, emit_human, emit_json};
use crate::error::{Result, SyncError};
use crate::remote::RemoteStore;
use crate::sync::conflict::{self, Resolution, SyncConflict};
use crate::workspace::Workspace;

#[derive(Args, Debug)]
pub struct ConflictsArgs {
    #[command(subcommand)]
    pub command: ConflictsCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConflictsCommand {
    /// Check every local edit against the remote and list conflicts
    List(ConflictsListArgs),
    /// Resolve one conflicted file
    Resolve(ConflictsResolveArgs),
}

#[derive(Args, Debug)]
pub struct ConflictsListArgs {
    /// Source to check (defaults to the active source)
    #[arg(long)]
    pub source: Option<String>,
}

#[derive(Args, Debug)]
pub struct ConflictsResolveArgs {
    /// Conflicted file path, relative to the source root
    pub path: String,

    /// Strategy: local | remote | auto | file
    #[arg(long)]
    pub using: String,

    /// Source to resolve in (defaults to the active source)
    #[arg(long)]
    pub source: Option<String>,
}

pub fn run(ctx: &AppContext, args: &ConflictsArgs) -> Result<()> {
    match &args.command {
        ConflictsCommand::List(args) => list(ctx, args),
        ConflictsCommand::Resolve(args) => resolve(ctx, args),
    }
}

/// Conflict-check the dirty set without writing anything.
fn detect(
    source_id: &str,
    remote: &dyn RemoteStore,
    cache: &FileCache,
) -> Result<Vec<SyncConflict>> {
    let mut found = Vec::new();
    for file in cache.list_dirty_files(source_id) {
        if let Some(conflict) = conflict::check_conflict(remote, &file)? {
            found.push(conflict);
        }
    }
    Ok(found)
}

fn list(ctx: &AppContext, args: &ConflictsListArgs) -> Result<()> {
    let source = ctx.resolve_source(args.source.as_deref())?;
    let remote = AppContext::remote(source)?;
    let workspace = Workspace::open(&source.workdir)?;

    let mut cache = ctx.cache();
    workspace.seed_cache(&source.id, &mut cache)?;
    let conflicts = detect(&source.id, &remote, &cache)?;

    if ctx.machine {
        return emit_json(&serde_json::json!({
            "status": "ok",
            "source": source.id,
            "conflicts": conflicts,
        }));
    }

    let mut layout = HumanLayout::new();
    layout.title("Conflicts");
    if conflicts.is_empty() {
        layout.line("  No conflicts; local edits can be pushed.");
    } else {
        for c in &conflicts {
            let mergeable = if conflict::merge(c).success {
                "auto-mergeable"
            } else {
                "needs manual resolution"
            };
            layout.bullet(&format!("{} ({mergeable})", c.path));
        }
    }
    emit_human(layout);
    Ok(())
}

fn resolve(ctx: &AppContext, args: &ConflictsResolveArgs) -> Result<()> {
    let source = ctx.resolve_source(args.source.as_deref())?;
    let remote = AppContext::remote(source)?;
    let mut workspace = Workspace::open(&source.workdir)?;

    let mut cache = ctx.cache();
    workspace.seed_cache(&source.id, &mut cache)?;

    let Some(file) = cache.get(&source.id, &args.path).cloned() else {
        return Err(SyncError::NotFound(format!(
            "{} is not in the working tree",
            args.path
        )));
    };
    if !file.dirty {
        return Err(SyncError::Config(format!(
            "{} has no local edits to resolve",
            args.path
        )));
    }

    let Some(found) = conflict::check_conflict(&remote, &file)? else {
        let mut layout = HumanLayout::new();
        layout.title(&format!("{} is not conflicted", args.path));
        emit_human(layout);
        return Ok(());
    };

    let resolution = parse_resolution(&args.using, &found, &workspace)?;
    conflict::resolve_conflict(&mut cache, &source.id, &found, &resolution);

    // Persist the outcome: the observed remote state is the new base and
    // the resolved content is the working copy, still awaiting a push.
    let entry = cache
        .get(&source.id, &args.path)
        .ok_or_else(|| SyncError::NotFound(args.path.clone()))?;
    workspace.record_base(&args.path, &entry.content, &entry.token)?;
    workspace.write_working(&args.path, entry.effective_content())?;

    if ctx.machine {
        return emit_json(&serde_json::json!({
            "status": "ok",
            "path": args.path,
            "using": args.using,
        }));
    }
    let mut layout = HumanLayout::new();
    layout
        .title("Conflict resolved")
        .kv("Path", &args.path)
        .kv("Using", &args.using)
        .line("  Run `tb push` to commit the resolution.");
    emit_human(layout);
    Ok(())
}

fn parse_resolution(
    raw: &str,
    found: &SyncConflict,
    workspace: &Workspace,
) -> Result<Resolution> {
    match raw {
        "local" | "mine" => Ok(Resolution::Local),
        "remote" | "theirs" => Ok(Resolution::Remote),
        "auto" => {
            let merged = conflict::merge(found);
            match merged.content {
                Some(content) => Ok(Resolution::Merged(content)),
                None => {
                    // Leave the marker block in the working file so the
                    // user can edit it and re-run with --using file.
                    if let Some(markers) = &merged.conflict_markers {
                        workspace.write_working(&found.path, markers)?;
                    }
                    Err(SyncError::Conflict(format!(
                        "{}: auto-merge failed; conflict markers written to the working file, \
                         edit it and re-run with --using file",
                        found.path
                    )))
                }
            }
        }
        "file" => {
            let (_, content) = workspace
                .scan()?
                .into_iter()
                .find(|(path, _)| path == &found.path)
                .ok_or_else(|| SyncError::NotFound(found.path.clone()))?;
            Ok(Resolution::Merged(content))
        }
        _ => Err(SyncError::Config(format!(
            "unknown resolution: {raw} (use local|remote|auto|file)"
        ))),
    }
}
