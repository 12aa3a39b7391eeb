mod common;

use common::cli::{BridgeWorkspace, EXPORT_CSV, run_tkb, run_tkb_with_env};
use serde_json::json;

#[test]
fn e2e_issues_json_flattens_query_and_closure() {
    let _log = common::test_log("e2e_issues_json_flattens_query_and_closure");
    let workspace = BridgeWorkspace::new();

    let run = run_tkb(&workspace, ["issues", "-Q", "key = SRC-1", "--json"], "issues_key");
    assert!(run.status.success(), "issues failed: {}", run.stderr);

    let json = run.json();
    let keys: Vec<&str> = json
        .as_object()
        .expect("closure object")
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(keys, ["SRC-1", "SRC-10", "SRC-2"]);

    assert_eq!(
        json["SRC-1"],
        json!({
            "dependantIssues": ["SRC-2"],
            "dueDate": "2024-03-01",
            "externalLinkingId": "DST-7",
            "issueKey": "SRC-1",
            "issueType": "Story",
            "labels": ["web", "checkout"],
            "parentLink": "SRC-10",
            "projectKey": "SRC",
            "summary": "Checkout flow"
        })
    );
}

#[test]
fn e2e_issues_links_of_other_types_are_not_followed() {
    let _log = common::test_log("e2e_issues_links_of_other_types_are_not_followed");
    let workspace = BridgeWorkspace::new();

    let run = run_tkb(&workspace, ["issues", "-Q", "key = SRC-1", "--json"], "issues_links");
    assert!(run.status.success(), "issues failed: {}", run.stderr);
    assert!(run.json().get("SRC-3").is_none(), "relates-to link was followed");
}

#[test]
fn e2e_issues_keeps_unparseable_dates_and_empty_link_lists() {
    let _log = common::test_log("e2e_issues_keeps_unparseable_dates_and_empty_link_lists");
    let workspace = BridgeWorkspace::new();

    let run = run_tkb(&workspace, ["issues", "-Q", "key = SRC-10", "--json"], "issues_epic");
    assert!(run.status.success(), "issues failed: {}", run.stderr);

    let json = run.json();
    assert_eq!(json["SRC-10"]["dueDate"], "not a date");
    assert_eq!(json["SRC-10"]["dependantIssues"], json!([]));
    assert!(json["SRC-10"].get("externalLinkingId").is_none());
}

#[test]
fn e2e_issues_depth_zero_skips_references() {
    let _log = common::test_log("e2e_issues_depth_zero_skips_references");
    let workspace = BridgeWorkspace::new();

    let run = run_tkb(
        &workspace,
        ["issues", "-Q", "key = SRC-1", "--depth", "0", "--json"],
        "issues_depth_zero",
    );
    assert!(run.status.success(), "issues failed: {}", run.stderr);

    let json = run.json();
    assert_eq!(json.as_object().map(serde_json::Map::len), Some(1));
    assert_eq!(json["SRC-1"]["parentLink"], "SRC-10");
}

#[test]
fn e2e_issues_project_query() {
    let _log = common::test_log("e2e_issues_project_query");
    let workspace = BridgeWorkspace::new();

    let run = run_tkb(&workspace, ["issues", "-Q", "project = ops", "--json"], "issues_project");
    assert!(run.status.success(), "issues failed: {}", run.stderr);

    let json = run.json();
    let keys: Vec<&String> = json.as_object().expect("object").keys().collect();
    assert_eq!(keys, ["OPS-1"]);
}

#[test]
fn e2e_issues_key_in_query_without_links() {
    let _log = common::test_log("e2e_issues_key_in_query_without_links");
    let workspace = BridgeWorkspace::new();

    let run = run_tkb(
        &workspace,
        ["issues", "-Q", "key in (SRC-3, OPS-1, NOPE-1)", "--json"],
        "issues_key_in",
    );
    assert!(run.status.success(), "issues failed: {}", run.stderr);

    let json = run.json();
    let keys: Vec<&String> = json.as_object().expect("object").keys().collect();
    assert_eq!(keys, ["OPS-1", "SRC-3"]);
}

#[test]
fn e2e_issues_csv_seeds_and_resolves_from_snapshot() {
    let _log = common::test_log("e2e_issues_csv_seeds_and_resolves_from_snapshot");
    let workspace = BridgeWorkspace::new();
    let csv = workspace.write("data/export.csv", EXPORT_CSV);

    let run = run_tkb(
        &workspace,
        ["issues", "--csv", csv.to_str().expect("utf8 path"), "--json"],
        "issues_csv",
    );
    assert!(run.status.success(), "issues failed: {}", run.stderr);

    let json = run.json();
    let keys: Vec<&String> = json.as_object().expect("object").keys().collect();
    assert_eq!(keys, ["CSV-1", "CSV-2", "SRC-10", "SRC-2"]);
    assert_eq!(
        json["CSV-1"],
        json!({
            "dependantIssues": ["SRC-2"],
            "dueDate": "2024-05-02",
            "externalLinkingId": "[DST]",
            "issueKey": "CSV-1",
            "issueType": "Task",
            "labels": ["ops", "infra"],
            "parentLink": "SRC-10",
            "projectKey": "CSV",
            "summary": "Import, then map"
        })
    );
    assert_eq!(
        json["CSV-2"],
        json!({
            "issueKey": "CSV-2",
            "issueType": "Bug",
            "projectKey": "CSV",
            "summary": "Blank link"
        })
    );
}

#[test]
fn e2e_issues_csv_resolves_against_data_folder() {
    let _log = common::test_log("e2e_issues_csv_resolves_against_data_folder");
    let workspace = BridgeWorkspace::new();
    workspace.write("exports/export.csv", EXPORT_CSV);

    let run = run_tkb_with_env(
        &workspace,
        ["issues", "--csv", "export.csv", "--depth", "0", "--json"],
        [("TKB_SOURCE_DATA_FOLDER", "exports")],
        "issues_data_folder",
    );
    assert!(run.status.success(), "issues failed: {}", run.stderr);

    let json = run.json();
    let keys: Vec<&String> = json.as_object().expect("object").keys().collect();
    assert_eq!(keys, ["CSV-1", "CSV-2"]);
}

#[test]
fn e2e_issues_text_table() {
    let _log = common::test_log("e2e_issues_text_table");
    let workspace = BridgeWorkspace::new();

    let run = run_tkb_with_env(
        &workspace,
        ["issues", "-Q", "key = OPS-1"],
        [("COLUMNS", "120")],
        "issues_text",
    );
    assert!(run.status.success(), "issues failed: {}", run.stderr);

    let header = run.stdout.lines().next().expect("header line");
    assert!(header.contains("Issue Key"), "header: {header}");
    assert!(header.contains("Summary"), "header: {header}");
    assert!(!header.contains("Due Date"), "empty column shown: {header}");
    assert!(run.stdout.contains("Rotate keys"));
    assert!(run.stdout.trim_end().ends_with("1 issue(s)"));
}

#[test]
fn e2e_issues_empty_result() {
    let _log = common::test_log("e2e_issues_empty_result");
    let workspace = BridgeWorkspace::new();

    let run = run_tkb(&workspace, ["issues", "-Q", "project = NONE"], "issues_empty");
    assert!(run.status.success(), "issues failed: {}", run.stderr);
    assert_eq!(run.stdout.trim(), "No issues found.");

    let run = run_tkb(&workspace, ["issues", "-Q", "project = NONE", "--json"], "issues_empty_json");
    assert!(run.status.success(), "issues failed: {}", run.stderr);
    assert_eq!(run.json(), json!({}));
}
