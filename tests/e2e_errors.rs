mod common;

use common::cli::{BridgeWorkspace, run_tkb};

#[test]
fn e2e_error_not_initialized() {
    let _log = common::test_log("e2e_error_not_initialized");
    let workspace = BridgeWorkspace::bare();

    let run = run_tkb(&workspace, ["issues", "--json"], "not_initialized");
    assert!(!run.status.success());
    assert_eq!(run.status.code(), Some(7));

    let error = run.error_json();
    assert_eq!(error["error"]["code"], "NOT_INITIALIZED");
    assert_eq!(error["error"]["retryable"], false);
}

#[test]
fn e2e_error_missing_bridge_dir_flag() {
    let _log = common::test_log("e2e_error_missing_bridge_dir_flag");
    let workspace = BridgeWorkspace::new();

    let run = run_tkb(
        &workspace,
        ["config", "--bridge-dir", "does-not-exist", "--json"],
        "missing_bridge_dir",
    );
    assert_eq!(run.status.code(), Some(7));
    assert_eq!(run.error_json()["error"]["code"], "CONFIG_ERROR");
}

#[test]
fn e2e_error_unsupported_query() {
    let _log = common::test_log("e2e_error_unsupported_query");
    let workspace = BridgeWorkspace::new();

    let run = run_tkb(
        &workspace,
        ["issues", "-Q", "status = Open", "--json"],
        "invalid_query",
    );
    assert_eq!(run.status.code(), Some(4));

    let error = run.error_json();
    assert_eq!(error["error"]["code"], "INVALID_QUERY");
    assert!(
        error["error"]["message"]
            .as_str()
            .is_some_and(|m| m.contains("status = Open")),
        "message: {}",
        error["error"]["message"]
    );
}

#[test]
fn e2e_error_mapping_not_found() {
    let _log = common::test_log("e2e_error_mapping_not_found");
    let workspace = BridgeWorkspace::new();
    std::fs::remove_file(workspace.path("mappings/source.yaml")).expect("remove mapping");

    let run = run_tkb(&workspace, ["issues", "--json"], "mapping_not_found");
    assert_eq!(run.status.code(), Some(2));
    assert_eq!(run.error_json()["error"]["code"], "MAPPING_NOT_FOUND");
}

#[test]
fn e2e_error_mapping_key_collision() {
    let _log = common::test_log("e2e_error_mapping_key_collision");
    let workspace = BridgeWorkspace::new();
    workspace.write(
        "mappings/source.yaml",
        "jiraFieldMappings:\n  Issue Key:\n    issueAttributeName: key\n  issue-key:\n    issueAttributeName: fields.key\n",
    );

    let run = run_tkb(&workspace, ["mapping", "--json"], "mapping_collision");
    assert_eq!(run.status.code(), Some(2));

    let error = run.error_json();
    assert_eq!(error["error"]["code"], "INVALID_MAPPING");
    assert!(
        error["error"]["message"]
            .as_str()
            .is_some_and(|m| m.contains("issueKey")),
        "message: {}",
        error["error"]["message"]
    );
}

#[test]
fn e2e_error_mapping_unknown_attribute() {
    let _log = common::test_log("e2e_error_mapping_unknown_attribute");
    let workspace = BridgeWorkspace::new();
    workspace.write(
        "mappings/source.yaml",
        "jiraFieldMappings:\n  Summary:\n    issueAttribute: fields.summary\n",
    );

    let run = run_tkb(&workspace, ["mapping", "--json"], "mapping_unknown_attribute");
    assert_eq!(run.status.code(), Some(2));
    assert_eq!(run.error_json()["error"]["code"], "INVALID_MAPPING");
}

#[test]
fn e2e_error_snapshot_line_is_not_json() {
    let _log = common::test_log("e2e_error_snapshot_line_is_not_json");
    let workspace = BridgeWorkspace::new();
    workspace.write(
        "source.jsonl",
        "{\"key\":\"A-1\",\"fields\":{}}\n\n{not json\n",
    );

    let run = run_tkb(&workspace, ["issues", "--json"], "snapshot_bad_line");
    assert_eq!(run.status.code(), Some(6));

    let error = run.error_json();
    assert_eq!(error["error"]["code"], "JSONL_PARSE_ERROR");
    assert!(
        error["error"]["message"]
            .as_str()
            .is_some_and(|m| m.contains("line 3")),
        "message: {}",
        error["error"]["message"]
    );
}

#[test]
fn e2e_error_csv_not_utf8() {
    let _log = common::test_log("e2e_error_csv_not_utf8");
    let workspace = BridgeWorkspace::new();
    let csv = workspace.bridge_dir.join("broken.csv");
    std::fs::write(&csv, b"Issue key,Summary\nA-1,caf\xE9\n").expect("write csv");

    let run = run_tkb(
        &workspace,
        ["issues", "--csv", csv.to_str().expect("utf8 path"), "--json"],
        "csv_not_utf8",
    );
    assert_eq!(run.status.code(), Some(6));
    let error = run.error_json();
    assert_eq!(error["error"]["code"], "CSV_PARSE_ERROR");
    assert_eq!(error["error"]["context"]["line"], 2);
}

#[test]
fn e2e_error_destination_snapshot_missing() {
    let _log = common::test_log("e2e_error_destination_snapshot_missing");
    let workspace = BridgeWorkspace::new();

    let run = run_tkb(&workspace, ["issues", "--destination", "--json"], "destination_missing");
    assert_eq!(run.status.code(), Some(7));
    assert_eq!(run.error_json()["error"]["code"], "CONFIG_ERROR");
}

#[test]
fn e2e_error_query_conflicts_with_csv() {
    let _log = common::test_log("e2e_error_query_conflicts_with_csv");
    let workspace = BridgeWorkspace::new();

    let run = run_tkb(
        &workspace,
        ["issues", "-Q", "key = A-1", "--csv", "export.csv"],
        "query_csv_conflict",
    );
    assert!(!run.status.success());
    assert_eq!(run.status.code(), Some(2), "clap usage errors exit with 2");
    assert!(run.stderr.contains("cannot be used with"), "stderr: {}", run.stderr);
}
