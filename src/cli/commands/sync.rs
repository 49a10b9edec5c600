use clap::Args;

use crate::app::AppContext;
use crate::error::{Result, SyncError};
use crate::sync::SyncEngine;
use crate::workspace::Workspace;

use super::{emit_report, fail_on_error};

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Source to sync (defaults to the active source)
    #[arg(long)]
    pub source: Option<String>,

    /// Commit message for the remote writes
    #[arg(long, short = 'M')]
    pub message: Option<String>,
}

pub fn run(ctx: &AppContext, args: &SyncArgs) -> Result<()> {
    let source = ctx.resolve_source(args.source.as_deref())?;
    if source.read_only {
        return Err(SyncError::Config(format!(
            "source {} is read-only; use tb pull",
            source.id
        )));
    }
    let remote = AppContext::remote(source)?;
    let mut workspace = Workspace::open(&source.workdir)?;

    let mut cache = ctx.cache();
    workspace.seed_cache(&source.id, &mut cache)?;
    let message = ctx.commit_message(args.message.as_deref());
    let report = SyncEngine::new(&source.id, &remote, &mut cache).sync(&message);
    workspace.apply_report(&source.id, &cache, &report)?;

    emit_report(ctx, "sync", &report)?;
    fail_on_error("sync", &report)
}
