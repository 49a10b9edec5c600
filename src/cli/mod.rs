//! CLI module - command-line interface definitions and handlers.
//!
//! Uses clap v4 with derive macros for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod commands;
pub mod output;

/// tb - GitHub-backed markdown task board sync
#[derive(Parser, Debug)]
#[command(name = "tb")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable machine-readable JSON output
    #[arg(long, short = 'm', global = true)]
    pub machine: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: ~/.config/tb/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the active source and local edits awaiting a push
    Status(commands::status::StatusArgs),

    /// Fetch remote task files into the working tree
    Pull(commands::pull::PullArgs),

    /// Push local edits to the remote, refusing on conflicts
    Push(commands::push::PushArgs),

    /// Pull then push in one run
    Sync(commands::sync::SyncArgs),

    /// Inspect and resolve conflicts blocking a push
    Conflicts(commands::conflicts::ConflictsArgs),

    /// Manage configured sources
    Source(commands::source::SourceArgs),

    /// List or delete tasks in the working tree
    Tasks(commands::tasks::TasksArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sync_with_message() {
        let cli = Cli::parse_from(["tb", "sync", "--message", "board update"]);
        let Commands::Sync(args) = cli.command else {
            panic!("expected sync command");
        };
        assert_eq!(args.message.as_deref(), Some("board update"));
    }

    #[test]
    fn machine_flag_is_global() {
        let cli = Cli::parse_from(["tb", "status", "-m"]);
        assert!(cli.machine);
    }

    #[test]
    fn verbosity_counts() {
        let cli = Cli::parse_from(["tb", "-vv", "status"]);
        assert_eq!(cli.verbose, 2);
    }
}
