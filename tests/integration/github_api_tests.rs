//! GitHub API wire tests.
//!
//! Exercises `GithubRemote` against a local mock server: URL shapes,
//! base64 decoding, token threading, and the HTTP status → error
//! taxonomy mapping.

use httpmock::prelude::*;
use serde_json::json;

use tb::SyncError;
use tb::config::GithubConfig;
use tb::remote::{GithubRemote, RemoteStore, Token};

fn config() -> GithubConfig {
    GithubConfig {
        owner: "acme".to_string(),
        repo: "tasks".to_string(),
        branch: "main".to_string(),
        root: "boards".to_string(),
        token_env: "TB_GITHUB_TOKEN".to_string(),
    }
}

fn remote_for(server: &MockServer) -> GithubRemote {
    GithubRemote::with_base_url(&config(), "test-token", &server.base_url()).expect("client")
}

#[test]
fn list_files_filters_markdown_blobs_under_root() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/repos/acme/tasks/git/trees/main")
            .query_param("recursive", "1")
            .header("authorization", "Bearer test-token");
        then.status(200).json_body(json!({
            "sha": "tree-sha",
            "truncated": false,
            "tree": [
                { "path": "boards/todo/a.md", "type": "blob", "sha": "sha-a" },
                { "path": "boards/done/b.md", "type": "blob", "sha": "sha-b" },
                { "path": "boards/todo", "type": "tree", "sha": "sha-dir" },
                { "path": "boards/image.png", "type": "blob", "sha": "sha-img" },
                { "path": "README.md", "type": "blob", "sha": "sha-readme" },
            ],
        }));
    });

    let files = remote_for(&server).list_files().expect("listing");
    mock.assert();

    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["todo/a.md", "done/b.md"]);
    assert_eq!(files[0].token, Token::Known("sha-a".to_string()));
}

#[test]
fn get_file_decodes_wrapped_base64() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/repos/acme/tasks/contents/boards/todo/a.md")
            .query_param("ref", "main");
        then.status(200).json_body(json!({
            "sha": "sha-a",
            "encoding": "base64",
            // GitHub wraps base64 bodies in newlines
            "content": "LS0tCmlkOiB0MQp0aXRsZTogQWxwaGEKc3RhdHVzOiB0b2RvCi0tLQoKRmlyc3QgdGFzayBib2R5\nCg==\n",
        }));
    });

    let fetched = remote_for(&server).get_file("todo/a.md").expect("fetch");
    assert_eq!(
        fetched.content,
        "---\nid: t1\ntitle: Alpha\nstatus: todo\n---\n\nFirst task body\n"
    );
    assert_eq!(fetched.token, Token::Known("sha-a".to_string()));
}

#[test]
fn get_missing_file_is_not_found() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/repos/acme/tasks/contents/boards/ghost.md");
        then.status(404)
            .json_body(json!({ "message": "Not Found" }));
    });

    let err = remote_for(&server)
        .get_file("ghost.md")
        .expect_err("absent file");
    assert!(matches!(err, SyncError::NotFound(_)));
}

#[test]
fn bad_credentials_map_to_unauthorized() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/repos/acme/tasks/contents/boards/a.md");
        then.status(401)
            .json_body(json!({ "message": "Bad credentials" }));
    });

    let err = remote_for(&server).get_file("a.md").expect_err("401");
    match err {
        SyncError::Unauthorized(message) => assert!(message.contains("Bad credentials")),
        other => panic!("expected Unauthorized, got {other:?}"),
    }
}

#[test]
fn exhausted_quota_maps_to_rate_limited() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/repos/acme/tasks/contents/boards/a.md");
        then.status(403)
            .header("x-ratelimit-remaining", "0")
            .header("retry-after", "30")
            .json_body(json!({ "message": "API rate limit exceeded" }));
    });

    let err = remote_for(&server).get_file("a.md").expect_err("403");
    match err {
        SyncError::RateLimited { retry_after, .. } => assert_eq!(retry_after, Some(30)),
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[test]
fn put_create_omits_sha_and_returns_new_token() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(PUT)
            .path("/repos/acme/tasks/contents/boards/new.md")
            .json_body_includes(
                r#"{ "message": "add task", "branch": "main", "content": "aGVsbG8gd29ybGQ=" }"#,
            );
        then.status(201).json_body(json!({
            "content": { "sha": "sha-new" },
            "commit": { "sha": "commit-1" },
        }));
    });

    let token = remote_for(&server)
        .put_file("new.md", "hello world", "add task", &Token::None)
        .expect("create");
    mock.assert();
    assert_eq!(token, Token::Known("sha-new".to_string()));
}

#[test]
fn put_update_sends_expected_sha() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(PUT)
            .path("/repos/acme/tasks/contents/boards/a.md")
            .json_body_includes(r#"{ "sha": "sha-old" }"#);
        then.status(200).json_body(json!({
            "content": { "sha": "sha-next" },
        }));
    });

    let token = remote_for(&server)
        .put_file(
            "a.md",
            "hello world",
            "update task",
            &Token::Known("sha-old".to_string()),
        )
        .expect("update");
    mock.assert();
    assert_eq!(token, Token::Known("sha-next".to_string()));
}

#[test]
fn put_with_stale_sha_maps_to_conflict() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(PUT)
            .path("/repos/acme/tasks/contents/boards/a.md");
        then.status(409)
            .json_body(json!({ "message": "a.md does not match sha-stale" }));
    });

    let err = remote_for(&server)
        .put_file(
            "a.md",
            "content",
            "update",
            &Token::Known("sha-stale".to_string()),
        )
        .expect_err("stale sha");
    assert!(matches!(err, SyncError::Conflict(_)));
}

#[test]
fn delete_sends_sha_and_branch() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(DELETE)
            .path("/repos/acme/tasks/contents/boards/a.md")
            .json_body_includes(r#"{ "sha": "sha-a", "branch": "main" }"#);
        then.status(200).json_body(json!({ "commit": { "sha": "commit-2" } }));
    });

    remote_for(&server)
        .delete_file("a.md", "remove task", &Token::Known("sha-a".to_string()))
        .expect("delete");
    mock.assert();
}

#[test]
fn delete_already_gone_is_not_found() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(DELETE)
            .path("/repos/acme/tasks/contents/boards/a.md");
        then.status(404).json_body(json!({ "message": "Not Found" }));
    });

    let err = remote_for(&server)
        .delete_file("a.md", "remove task", &Token::Known("sha-a".to_string()))
        .expect_err("already gone");
    assert!(err.is_not_found());
}
