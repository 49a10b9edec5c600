//! Property tests for the line-based three-way merge.

use proptest::prelude::*;

use tb::remote::Token;
use tb::sync::{LOCAL_MARKER, REMOTE_MARKER, SEPARATOR_MARKER, SyncConflict, merge};

fn conflict(base: &str, local: &str, remote: &str) -> SyncConflict {
    SyncConflict {
        path: "t.md".to_string(),
        base_content: base.to_string(),
        local_content: local.to_string(),
        remote_content: remote.to_string(),
        local_token: Token::Known("sha-local".to_string()),
        remote_token: Token::Known("sha-remote".to_string()),
    }
}

/// Multi-line content without conflict-marker lookalikes.
fn content() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-z0-9 .#-]{0,20}", 0..12).prop_map(|lines| lines.join("\n"))
}

proptest! {
    /// All three sides identical: merge succeeds and is the identity.
    #[test]
    fn merge_identity(text in content()) {
        let result = merge(&conflict(&text, &text, &text));
        prop_assert!(result.success);
        prop_assert!(!result.has_conflicts);
        prop_assert_eq!(result.content.unwrap(), text);
    }

    /// Only the remote changed: the merge takes the remote wholesale.
    #[test]
    fn merge_take_remote(base in content(), remote in content()) {
        let result = merge(&conflict(&base, &base, &remote));
        prop_assert!(result.success);
        let merged = result.content.unwrap();
        // Identical line counts mean exact equality; shorter sides are
        // padded with empty lines by the positional merge.
        if base.split('\n').count() <= remote.split('\n').count() {
            prop_assert_eq!(merged, remote);
        } else {
            prop_assert!(merged.starts_with(&remote));
        }
    }

    /// Only the local side changed: symmetric to take-remote.
    #[test]
    fn merge_take_local(base in content(), local in content()) {
        let result = merge(&conflict(&base, &local, &base));
        prop_assert!(result.success);
        let merged = result.content.unwrap();
        if base.split('\n').count() <= local.split('\n').count() {
            prop_assert_eq!(merged, local);
        } else {
            prop_assert!(merged.starts_with(&local));
        }
    }

    /// A merge either succeeds with content or fails with markers,
    /// never both and never neither.
    #[test]
    fn merge_outcome_is_exclusive(base in content(), local in content(), remote in content()) {
        let result = merge(&conflict(&base, &local, &remote));
        prop_assert_eq!(result.success, !result.has_conflicts);
        prop_assert_eq!(result.success, result.content.is_some());
        prop_assert_eq!(result.has_conflicts, result.conflict_markers.is_some());
    }

    /// Conflict markers always come in complete, ordered blocks.
    #[test]
    fn marker_blocks_are_well_formed(base in content(), local in content(), remote in content()) {
        let result = merge(&conflict(&base, &local, &remote));
        if let Some(markers) = &result.conflict_markers {
            let opens = markers.matches(LOCAL_MARKER).count();
            let seps = markers.matches(SEPARATOR_MARKER).count();
            let closes = markers.matches(REMOTE_MARKER).count();
            prop_assert!(opens >= 1);
            prop_assert_eq!(opens, seps);
            prop_assert_eq!(opens, closes);

            let first_open = markers.find(LOCAL_MARKER).unwrap();
            let first_sep = markers.find(SEPARATOR_MARKER).unwrap();
            let first_close = markers.find(REMOTE_MARKER).unwrap();
            prop_assert!(first_open < first_sep && first_sep < first_close);
        }
    }
}
