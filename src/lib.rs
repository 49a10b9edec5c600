pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod remote;
pub mod sync;
pub mod task;
pub mod workspace;

pub use error::{Result, SyncError};

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
