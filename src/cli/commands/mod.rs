//! Command handlers, one module per subcommand.

use crate::app::AppContext;
use crate::cli::Commands;
use crate::cli::output::{HumanLayout, emit_human, emit_json};
use crate::error::{Result, SyncError};
use crate::sync::SyncReport;

pub mod conflicts;
pub mod pull;
pub mod push;
pub mod source;
pub mod status;
pub mod sync;
pub mod tasks;

pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Status(args) => status::run(ctx, args),
        Commands::Pull(args) => pull::run(ctx, args),
        Commands::Push(args) => push::run(ctx, args),
        Commands::Sync(args) => sync::run(ctx, args),
        Commands::Conflicts(args) => conflicts::run(ctx, args),
        Commands::Source(args) => source::run(ctx, args),
        Commands::Tasks(args) => tasks::run(ctx, args),
    }
}

/// Print a sync report in the selected output mode.
pub(crate) fn emit_report(ctx: &AppContext, action: &str, report: &SyncReport) -> Result<()> {
    if ctx.machine {
        return emit_json(&serde_json::json!({
            "status": if report.success { "ok" } else { "failed" },
            "action": action,
            "report": report,
        }));
    }

    let mut layout = HumanLayout::new();
    layout.title(&format!(
        "{} {}",
        capitalize(action),
        if report.success { "completed" } else { "failed" }
    ));
    layout.kv("Summary", &report.summary_line());
    for path in &report.pulled {
        layout.bullet(&format!("pulled {path}"));
    }
    for path in &report.pushed {
        layout.bullet(&format!("pushed {path}"));
    }
    for conflict in &report.conflicts {
        layout.warn(&format!(
            "conflict in {} (resolve with: tb conflicts resolve {})",
            conflict.path, conflict.path
        ));
    }
    if let Some(error) = &report.error {
        layout.warn(error);
    }
    emit_human(layout);
    Ok(())
}

/// Turn a failed report into a nonzero exit after it has been printed.
pub(crate) fn fail_on_error(action: &str, report: &SyncReport) -> Result<()> {
    if report.success {
        Ok(())
    } else {
        Err(SyncError::SyncFailed(format!(
            "{action}: {}",
            report
                .error
                .clone()
                .unwrap_or_else(|| "unknown error".to_string())
        )))
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
