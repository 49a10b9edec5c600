//! End-to-end sync flows over an in-memory remote.
//!
//! Walks the full edit → conflict → resolve → push lifecycle the way the
//! CLI drives it: a workspace on disk seeds the cache, the engine runs,
//! and the outcome lands back in the working tree.

use std::fs;

use tb::cache::FileCache;
use tb::remote::RemoteStore;
use tb::remote::mock::{MockRemote, content_token};
use tb::sync::conflict::{Resolution, resolve_conflict};
use tb::sync::{SyncEngine, merge};
use tb::workspace::Workspace;

const SRC: &str = "work";

const TASK_V1: &str = "---\nid: t1\ntitle: Alpha\nstatus: todo\n---\n\nFirst pass\n";
const TASK_V2: &str = "---\nid: t1\ntitle: Alpha\nstatus: in-progress\n---\n\nFirst pass\n";
const TASK_REMOTE: &str = "---\nid: t1\ntitle: Alpha\nstatus: done\n---\n\nFirst pass\n";

struct Fixture {
    remote: MockRemote,
    _dir: tempfile::TempDir,
    workspace: Workspace,
    cache: FileCache,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let workspace = Workspace::open(dir.path()).expect("workspace");
        Self {
            remote: MockRemote::new(),
            _dir: dir,
            workspace,
            cache: FileCache::new(),
        }
    }

    /// Re-seed the cache from the working tree, as each CLI run does.
    fn reload(&mut self) {
        self.cache = FileCache::new();
        self.workspace
            .seed_cache(SRC, &mut self.cache)
            .expect("seed");
    }

    fn sync(&mut self, message: &str) -> tb::sync::SyncReport {
        self.reload();
        let report = SyncEngine::new(SRC, &self.remote, &mut self.cache).sync(message);
        self.workspace
            .apply_report(SRC, &self.cache, &report)
            .expect("apply");
        report
    }

    fn working_file(&self, path: &str) -> String {
        fs::read_to_string(self.workspace.root().join(path)).expect("working file")
    }

    fn edit(&self, path: &str, content: &str) {
        fs::write(self.workspace.root().join(path), content).expect("edit");
    }
}

#[test]
fn initial_sync_populates_working_tree() {
    let mut fx = Fixture::new();
    fx.remote.seed("todo/t1.md", TASK_V1);
    fx.remote.seed("todo/t2.md", "---\nid: t2\ntitle: Beta\n---\n");

    let report = fx.sync("initial");
    assert!(report.success);
    assert_eq!(report.pulled.len(), 2);
    assert!(report.pushed.is_empty());
    assert_eq!(fx.working_file("todo/t1.md"), TASK_V1);
    assert!(fx.workspace.dirty_files().unwrap().is_empty());
}

#[test]
fn local_edit_pushes_and_clears() {
    let mut fx = Fixture::new();
    fx.remote.seed("todo/t1.md", TASK_V1);
    fx.sync("initial");

    fx.edit("todo/t1.md", TASK_V2);
    assert_eq!(
        fx.workspace.dirty_files().unwrap(),
        vec!["todo/t1.md".to_string()]
    );

    let report = fx.sync("move to in-progress");
    assert!(report.success);
    assert_eq!(report.pushed, vec!["todo/t1.md".to_string()]);
    assert_eq!(fx.remote.content_of("todo/t1.md").as_deref(), Some(TASK_V2));
    assert!(fx.workspace.dirty_files().unwrap().is_empty());
}

#[test]
fn concurrent_remote_change_blocks_push_with_conflict() {
    let mut fx = Fixture::new();
    fx.remote.seed("todo/t1.md", TASK_V1);
    fx.sync("initial");

    // Local edit and a concurrent remote edit of the same file.
    fx.edit("todo/t1.md", TASK_V2);
    fx.remote.mutate_behind_our_back("todo/t1.md", TASK_REMOTE);

    let counts_before = fx.remote.counts();
    let report = fx.sync("conflicting edit");
    assert!(!report.success);
    assert_eq!(report.conflicts.len(), 1);
    // Nothing was written to the remote.
    assert_eq!(fx.remote.counts().put, counts_before.put);
    assert_eq!(
        fx.remote.content_of("todo/t1.md").as_deref(),
        Some(TASK_REMOTE)
    );

    let conflict = &report.conflicts[0];
    assert_eq!(conflict.path, "todo/t1.md");
    assert_eq!(conflict.base_content, TASK_V1);
    assert_eq!(conflict.local_content, TASK_V2);
    assert_eq!(conflict.remote_content, TASK_REMOTE);
    assert_eq!(conflict.local_token, content_token(TASK_V1));
    assert_eq!(conflict.remote_token, content_token(TASK_REMOTE));

    // The local edit is still in the working tree, not clobbered.
    assert_eq!(fx.working_file("todo/t1.md"), TASK_V2);
}

#[test]
fn single_line_divergence_yields_marker_block() {
    let fx_conflict = tb::sync::SyncConflict {
        path: "t.md".to_string(),
        base_content: "status: todo".to_string(),
        local_content: "status: in-progress".to_string(),
        remote_content: "status: done".to_string(),
        local_token: content_token("base"),
        remote_token: content_token("remote"),
    };

    let result = merge(&fx_conflict);
    assert!(result.has_conflicts);
    assert_eq!(
        result.conflict_markers.as_deref(),
        Some("<<<<<<< LOCAL\nstatus: in-progress\n=======\nstatus: done\n>>>>>>> REMOTE")
    );
}

#[test]
fn resolve_merged_then_sync_pushes_the_resolution() {
    const TASK_MERGED: &str =
        "---\nid: t1\ntitle: Alpha\nstatus: done\n---\n\nFirst pass (merged)\n";

    let mut fx = Fixture::new();
    fx.remote.seed("todo/t1.md", TASK_V1);
    fx.sync("initial");

    fx.edit("todo/t1.md", TASK_V2);
    fx.remote.mutate_behind_our_back("todo/t1.md", TASK_REMOTE);

    let report = fx.sync("conflicting edit");
    let conflict = report.conflicts[0].clone();

    // Hand-merged resolution, persisted the way the CLI resolve command
    // does it: remote state becomes the base, the resolution the working
    // copy.
    resolve_conflict(
        &mut fx.cache,
        SRC,
        &conflict,
        &Resolution::Merged(TASK_MERGED.to_string()),
    );
    let entry = fx.cache.get(SRC, "todo/t1.md").expect("entry").clone();
    fx.workspace
        .record_base("todo/t1.md", &entry.content, &entry.token)
        .expect("record base");
    fx.workspace
        .write_working("todo/t1.md", entry.effective_content())
        .expect("write working");

    let report = fx.sync("resolved");
    assert!(report.success, "push after resolution: {:?}", report.error);
    assert_eq!(report.pushed, vec!["todo/t1.md".to_string()]);
    assert_eq!(
        fx.remote.content_of("todo/t1.md").as_deref(),
        Some(TASK_MERGED)
    );
    assert!(fx.workspace.dirty_files().unwrap().is_empty());
}

#[test]
fn resolve_remote_leaves_nothing_to_push() {
    let mut fx = Fixture::new();
    fx.remote.seed("todo/t1.md", TASK_V1);
    fx.sync("initial");

    fx.edit("todo/t1.md", TASK_V2);
    fx.remote.mutate_behind_our_back("todo/t1.md", TASK_REMOTE);

    let report = fx.sync("conflicting edit");
    let conflict = report.conflicts[0].clone();

    resolve_conflict(&mut fx.cache, SRC, &conflict, &Resolution::Remote);
    let entry = fx.cache.get(SRC, "todo/t1.md").expect("entry").clone();
    fx.workspace
        .record_base("todo/t1.md", &entry.content, &entry.token)
        .expect("record base");
    fx.workspace
        .write_working("todo/t1.md", entry.effective_content())
        .expect("write working");

    // Taking the remote side aligns working and base content, so the
    // next run has nothing dirty and succeeds as a no-op push.
    let report = fx.sync("resolved");
    assert!(report.success);
    assert!(report.pushed.is_empty());
    assert_eq!(
        fx.remote.content_of("todo/t1.md").as_deref(),
        Some(TASK_REMOTE)
    );
    assert_eq!(fx.working_file("todo/t1.md"), TASK_REMOTE);
}

#[test]
fn pull_never_clobbers_local_edits() {
    let mut fx = Fixture::new();
    fx.remote.seed("todo/t1.md", TASK_V1);
    fx.remote.seed("todo/t2.md", "---\nid: t2\ntitle: Beta\n---\n");
    fx.sync("initial");

    fx.edit("todo/t1.md", TASK_V2);
    fx.remote.mutate_behind_our_back("todo/t1.md", TASK_REMOTE);
    fx.remote
        .mutate_behind_our_back("todo/t2.md", "---\nid: t2\ntitle: Beta2\n---\n");

    fx.reload();
    let report = SyncEngine::new(SRC, &fx.remote, &mut fx.cache).pull();
    fx.workspace
        .apply_report(SRC, &fx.cache, &report)
        .expect("apply");

    assert!(report.success);
    // Only the clean file was pulled.
    assert_eq!(report.pulled, vec!["todo/t2.md".to_string()]);
    assert_eq!(fx.working_file("todo/t1.md"), TASK_V2);
    assert!(fx.working_file("todo/t2.md").contains("Beta2"));
}

#[test]
fn batch_push_is_atomic_across_files() {
    let mut fx = Fixture::new();
    fx.remote.seed("a.md", "a1");
    fx.remote.seed("b.md", "b1");
    fx.remote.seed("c.md", "c1");
    fx.sync("initial");

    fx.edit("a.md", "a2");
    fx.edit("b.md", "b2");
    fx.edit("c.md", "c2");
    // One of the three diverges remotely.
    fx.remote.mutate_behind_our_back("b.md", "b1-remote");

    let report = fx.sync("batch");
    assert!(!report.success);
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].path, "b.md");
    assert_eq!(fx.remote.counts().put, 0);
    // All three files remain dirty for the retry after resolution.
    assert_eq!(fx.workspace.dirty_files().unwrap().len(), 3);
    assert_eq!(fx.remote.content_of("a.md").as_deref(), Some("a1"));
    assert_eq!(fx.remote.content_of("c.md").as_deref(), Some("c1"));
}

#[test]
fn deleting_a_task_removes_it_everywhere() {
    let mut fx = Fixture::new();
    fx.remote.seed("todo/t1.md", TASK_V1);
    fx.sync("initial");

    fx.reload();
    SyncEngine::new(SRC, &fx.remote, &mut fx.cache)
        .delete("todo/t1.md", "drop task")
        .expect("delete");
    fx.workspace.remove("todo/t1.md").expect("remove");

    assert!(fx.remote.content_of("todo/t1.md").is_none());
    assert!(fx.workspace.scan().unwrap().is_empty());
    assert!(fx.remote.list_files().unwrap().is_empty());
}

#[test]
fn new_remote_file_appears_on_next_sync() {
    let mut fx = Fixture::new();
    fx.remote.seed("a.md", "a1");
    fx.sync("initial");

    fx.remote.seed("b.md", "b1");
    let report = fx.sync("again");
    assert!(report.success);
    assert!(report.pulled.contains(&"b.md".to_string()));
    assert_eq!(fx.working_file("b.md"), "b1");
}

#[test]
fn remote_deletion_prunes_unedited_working_file() {
    let mut fx = Fixture::new();
    fx.remote.seed("a.md", "a1");
    fx.remote.seed("b.md", "b1");
    fx.sync("initial");

    fx.remote.delete_behind_our_back("b.md");
    let report = fx.sync("after external delete");
    assert!(report.success);
    assert!(fx.cache.get(SRC, "b.md").is_none());
    assert!(!fx.workspace.root().join("b.md").exists());
    // The untouched file survived.
    assert_eq!(fx.working_file("a.md"), "a1");
}

#[test]
fn remote_deletion_never_prunes_a_local_edit() {
    let mut fx = Fixture::new();
    fx.remote.seed("b.md", "b1");
    fx.sync("initial");

    fx.edit("b.md", "b2");
    fx.remote.delete_behind_our_back("b.md");
    let report = fx.sync("after external delete");

    // The dirty entry is preserved by refresh and pushed as a re-create
    // (the conflict check sees NotFound and treats it as a new file).
    assert!(report.success, "{:?}", report.error);
    assert_eq!(fx.working_file("b.md"), "b2");
    assert_eq!(fx.remote.content_of("b.md").as_deref(), Some("b2"));
}
