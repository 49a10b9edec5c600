//! Remote synchronization: pull/push orchestration and conflict handling.

pub mod conflict;
pub mod engine;

pub use conflict::{
    CheckOutcome, LOCAL_MARKER, MergeResult, REMOTE_MARKER, Resolution, SEPARATOR_MARKER,
    SyncConflict, check_conflict, check_file, merge, resolve_conflict,
};
pub use engine::{SyncEngine, SyncReport, SyncStage};
