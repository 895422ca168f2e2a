mod common;

use common::cli::{GhiRun, GhiWorkspace, extract_json_payload, run_ghi, run_ghi_with_env};
use serde_json::{Value, json};
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, body_string_contains, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const UNREACHABLE_API: &str = "http://127.0.0.1:9/graphql";

fn issue_url(number: u64) -> String {
    format!("https://github.com/octo/repo/issues/{number}")
}

async fn mount_issue(server: &MockServer, number: u64) {
    Mock::given(method("POST"))
        .and(body_string_contains("issueOrPullRequest"))
        .and(body_partial_json(json!({ "variables": { "number": number } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "repository": { "issueOrPullRequest": {
                "__typename": "Issue",
                "id": format!("NODE_{number}"),
                "number": number,
                "title": format!("Issue {number}"),
                "body": "",
                "url": issue_url(number),
                "labels": { "nodes": [] }
            } } }
        })))
        .mount(server)
        .await;
}

async fn mount_labels(server: &MockServer) {
    Mock::given(method("POST"))
        .and(body_string_contains("RepositoryOptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "repository": { "labels": { "nodes": [
                { "id": "L_BUG", "name": "bug" }
            ] } } }
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_add_label(server: &MockServer, number: u64, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(body_string_contains("addLabelsToLabelable"))
        .and(body_partial_json(json!({ "variables": { "input": {
            "labelableId": format!("NODE_{number}"),
            "labelIds": ["L_BUG"]
        } } })))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

fn ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "data": { "addLabelsToLabelable": { "__typename": "AddLabelsToLabelablePayload" } } }))
}

fn forbidden() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "data": null,
        "errors": [{ "type": "FORBIDDEN", "message": "forbidden" }]
    }))
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run_blocking(workspace: Arc<GhiWorkspace>, args: Vec<String>, label: &'static str) -> GhiRun {
    tokio::task::spawn_blocking(move || {
        run_ghi_with_env(&workspace, args, [("GH_TOKEN", "test-token")], label)
    })
    .await
    .expect("join ghi run")
}

fn edit_args(server: &MockServer, extra: &[&str]) -> Vec<String> {
    let mut args = vec![
        "edit".to_string(),
        "--repo".to_string(),
        "octo/repo".to_string(),
        "--api-url".to_string(),
        format!("{}/graphql", server.uri()),
    ];
    args.extend(extra.iter().map(|s| (*s).to_string()));
    args
}

#[test]
fn e2e_body_and_body_file_conflict() {
    let _log = common::test_log("e2e_body_and_body_file_conflict");
    let workspace = GhiWorkspace::new();

    let run = run_ghi(
        &workspace,
        ["edit", "1", "--body", "x", "--body-file", "body.md"],
        "body_conflict",
    );

    assert!(!run.status.success());
    assert!(run.stderr.contains("cannot be used with"), "stderr: {}", run.stderr);
}

#[test]
fn e2e_interactive_requires_terminal() {
    let _log = common::test_log("e2e_interactive_requires_terminal");
    let workspace = GhiWorkspace::new();

    let run = run_ghi(
        &workspace,
        ["edit", "1", "--repo", "octo/repo", "--api-url", UNREACHABLE_API, "--json"],
        "interactive_no_tty",
    );

    assert_eq!(run.code(), Some(2), "stderr: {}", run.stderr);
    let payload: Value =
        serde_json::from_str(&extract_json_payload(&run.stderr)).expect("error json");
    assert_eq!(payload["error"]["code"], "PROMPT_UNAVAILABLE");
    assert_eq!(
        payload["error"]["message"],
        "field to edit flag required when not running interactively"
    );
    assert!(run.stdout.is_empty());
}

#[test]
fn e2e_invalid_selector_is_input_error() {
    let _log = common::test_log("e2e_invalid_selector_is_input_error");
    let workspace = GhiWorkspace::new();

    let run = run_ghi(
        &workspace,
        ["edit", "not-a-number", "--title", "x", "-R", "octo/repo", "--api-url", UNREACHABLE_API],
        "invalid_selector",
    );

    assert_eq!(run.code(), Some(2), "stderr: {}", run.stderr);
    assert!(run.stderr.contains("INVALID_SELECTOR"), "stderr: {}", run.stderr);
}

#[test]
fn e2e_multiple_repositories_rejected() {
    let _log = common::test_log("e2e_multiple_repositories_rejected");
    let workspace = GhiWorkspace::new();

    let run = run_ghi(
        &workspace,
        [
            "edit",
            "https://github.com/octo/repo/issues/1",
            "https://github.com/other/repo/issues/2",
            "--add-label",
            "bug",
            "--api-url",
            UNREACHABLE_API,
        ],
        "multiple_repos",
    );

    assert_eq!(run.code(), Some(3), "stderr: {}", run.stderr);
    assert!(run.stderr.contains("multiple repositories"), "stderr: {}", run.stderr);
}

#[test]
fn e2e_bad_config_value_is_config_error() {
    let _log = common::test_log("e2e_bad_config_value_is_config_error");
    let workspace = GhiWorkspace::new();
    workspace.write_user_config("workers: lots\n");

    let run = run_ghi(&workspace, ["edit", "1", "--title", "x"], "bad_config");

    assert_eq!(run.code(), Some(7), "stderr: {}", run.stderr);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn e2e_batch_prints_urls_in_submission_order() {
    let _log = common::test_log("e2e_batch_prints_urls_in_submission_order");
    let server = MockServer::start().await;
    for number in 1..=3 {
        mount_issue(&server, number).await;
        mount_add_label(&server, number, ok()).await;
    }
    mount_labels(&server).await;

    let workspace = Arc::new(GhiWorkspace::new());
    let run = run_blocking(
        workspace,
        edit_args(&server, &["3", "1", "2", "--add-label", "bug"]),
        "batch_success",
    )
    .await;

    assert!(run.status.success(), "stderr: {}", run.stderr);
    let lines: Vec<&str> = run.stdout.lines().collect();
    assert_eq!(lines, vec![issue_url(3), issue_url(1), issue_url(2)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn e2e_partial_failure_reports_successes_and_error() {
    let _log = common::test_log("e2e_partial_failure_reports_successes_and_error");
    let server = MockServer::start().await;
    for number in 1..=3 {
        mount_issue(&server, number).await;
    }
    mount_labels(&server).await;
    mount_add_label(&server, 1, ok()).await;
    mount_add_label(&server, 2, forbidden()).await;
    mount_add_label(&server, 3, ok()).await;

    let workspace = Arc::new(GhiWorkspace::new());
    let run = run_blocking(
        workspace,
        edit_args(&server, &["1", "2", "3", "--add-label", "bug", "--workers", "0", "--json"]),
        "batch_partial",
    )
    .await;

    assert_eq!(run.code(), Some(4), "stderr: {}", run.stderr);
    let output: Value = serde_json::from_str(&extract_json_payload(&run.stdout)).expect("json");
    assert_eq!(output["updated"], json!([issue_url(1), issue_url(3)]));
    assert_eq!(output["failed"], 1);
    let error = output["error"].as_str().expect("error string");
    assert!(error.contains("issues/2"), "error: {error}");
    assert!(error.contains("forbidden"), "error: {error}");

    let structured: Value =
        serde_json::from_str(&extract_json_payload(&run.stderr)).expect("error json");
    assert_eq!(structured["error"]["code"], "TASK_FAILED");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn e2e_user_config_supplies_repo_and_endpoint() {
    let _log = common::test_log("e2e_user_config_supplies_repo_and_endpoint");
    let server = MockServer::start().await;
    mount_issue(&server, 5).await;
    Mock::given(method("POST"))
        .and(body_string_contains("updateIssue"))
        .and(body_partial_json(json!({ "variables": { "input": { "id": "NODE_5", "title": "Renamed" } } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "updateIssue": { "__typename": "UpdateIssuePayload" } } })))
        .expect(1)
        .mount(&server)
        .await;

    let workspace = Arc::new(GhiWorkspace::new());
    workspace.write_user_config(&format!(
        "repo: octo/repo\napi_url: {}/graphql\nhttp_timeout: 10s\n",
        server.uri()
    ));

    let args = vec![
        "edit".to_string(),
        "#5".to_string(),
        "--title".to_string(),
        "Renamed".to_string(),
    ];
    let run = run_blocking(workspace, args, "config_repo").await;

    assert!(run.status.success(), "stderr: {}", run.stderr);
    assert_eq!(run.stdout.trim(), issue_url(5));
}

#[test]
fn e2e_completions_bash() {
    let _log = common::test_log("e2e_completions_bash");
    let workspace = GhiWorkspace::new();

    let run = run_ghi(&workspace, ["completions", "bash"], "completions_bash");

    assert!(run.status.success(), "stderr: {}", run.stderr);
    assert!(run.stdout.contains("_ghi"));
    assert!(run.stdout.contains("--add-label"));
}

#[test]
fn e2e_edit_help_lists_field_flags() {
    use assert_cmd::Command;
    use predicates::prelude::*;

    let _log = common::test_log("e2e_edit_help_lists_field_flags");

    Command::new(assert_cmd::cargo::cargo_bin!("ghi"))
        .args(["edit", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--add-label")
                .and(predicate::str::contains("--body-file"))
                .and(predicate::str::contains("--milestone")),
        );
}
