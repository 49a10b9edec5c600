use clap::Args;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json};
use crate::error::Result;
use crate::workspace::Workspace;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Source to inspect (defaults to the active source)
    #[arg(long)]
    pub source: Option<String>,
}

pub fn run(ctx: &AppContext, args: &StatusArgs) -> Result<()> {
    let source = ctx.resolve_source(args.source.as_deref())?;
    let workspace = Workspace::open(&source.workdir)?;
    let dirty = workspace.dirty_files()?;
    let tracked = workspace.scan()?.len();

    if ctx.machine {
        return emit_json(&serde_json::json!({
            "status": "ok",
            "source": source.id,
            "repo": format!("{}/{}", source.github.owner, source.github.repo),
            "branch": source.github.branch,
            "workdir": source.workdir,
            "tracked": tracked,
            "dirty": dirty,
        }));
    }

    let mut layout = HumanLayout::new();
    layout
        .title(&format!("Source {}", source.id))
        .kv(
            "Repository",
            &format!(
                "{}/{} ({})",
                source.github.owner, source.github.repo, source.github.branch
            ),
        )
        .kv("Workdir", &source.workdir.display().to_string())
        .kv("Tracked files", &tracked.to_string());

    if dirty.is_empty() {
        layout.line("  Working tree clean, nothing to push.");
    } else {
        layout.blank().title("Local edits awaiting push");
        for path in &dirty {
            layout.bullet(path);
        }
    }
    emit_human(layout);
    Ok(())
}
