use clap::Args;

use crate::app::AppContext;
use crate::error::Result;
use crate::sync::SyncEngine;
use crate::workspace::Workspace;

use super::{emit_report, fail_on_error};

#[derive(Args, Debug)]
pub struct PullArgs {
    /// Source to pull (defaults to the active source)
    #[arg(long)]
    pub source: Option<String>,
}

pub fn run(ctx: &AppContext, args: &PullArgs) -> Result<()> {
    let source = ctx.resolve_source(args.source.as_deref())?;
    let remote = AppContext::remote(source)?;
    let mut workspace = Workspace::open(&source.workdir)?;

    let mut cache = ctx.cache();
    workspace.seed_cache(&source.id, &mut cache)?;
    let report = SyncEngine::new(&source.id, &remote, &mut cache).pull();
    workspace.apply_report(&source.id, &cache, &report)?;

    emit_report(ctx, "pull", &report)?;
    fail_on_error("pull", &report)
}
