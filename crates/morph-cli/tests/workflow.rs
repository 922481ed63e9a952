mod common;

use common::{morph_cmd, run_json, storage_home};
use serde_json::json;

#[test]
fn edits_persist_and_evaluate() {
    let home = storage_home();
    let (code, payload) = run_json(&home, &["--at", "#orders", "set", "json", "[1,2,3]"]);
    assert_eq!(code, 0, "{payload}");
    let (code, payload) = run_json(
        &home,
        &[
            "--at",
            "#orders",
            "set",
            "code",
            "local out = array()\nfor i, v in ipairs(json) do out[i] = v * 2 end\nreturn out",
        ],
    );
    assert_eq!(code, 0, "{payload}");
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["message"], "morph set: updated code of #orders");
    assert_eq!(payload["details"]["result"]["value"], json!([2, 4, 6]));

    let (_, shown) = run_json(&home, &["--at", "#orders", "show"]);
    assert_eq!(shown["details"]["json"], "[1,2,3]");
    assert_eq!(shown["details"]["persisted"], true);
    assert_eq!(shown["details"]["rendered"], "[\n  2,\n  4,\n  6\n]");
}

#[test]
fn address_env_selects_the_workspace() {
    let home = storage_home();
    morph_cmd(&home)
        .env("MORPH_ADDRESS", "https://play.example/#env")
        .args(["set", "json", "{\"a\":1}"])
        .assert()
        .success();
    let (_, listed) = run_json(&home, &["list"]);
    assert_eq!(listed["details"]["workspaces"][0]["address"], "#env");
    assert_eq!(listed["details"]["active"], "default");
}

#[test]
fn slow_workspaces_wait_for_run() {
    let home = storage_home();
    let (code, _) = run_json(&home, &["--at", "#s", "flag", "slow", "on"]);
    assert_eq!(code, 0);
    let (_, shown) = run_json(&home, &["--at", "#s", "show"]);
    assert_eq!(shown["details"]["mode"], "slow");
    assert_eq!(shown["details"]["result"], serde_json::Value::Null);

    let (code, ran) = run_json(&home, &["--at", "#s", "run"]);
    assert_eq!(code, 0);
    assert_eq!(ran["details"]["result"]["ok"], true);
    assert_eq!(ran["details"]["rendered"], "[]");
}

#[test]
fn script_faults_are_results_not_failures() {
    let home = storage_home();
    run_json(&home, &["--at", "#bad", "set", "code", "error('boom')"]);
    let (code, ran) = run_json(&home, &["--at", "#bad", "run"]);
    assert_eq!(code, 0);
    assert_eq!(ran["message"], "morph run: #bad failed: Error");
    assert_eq!(ran["details"]["result"]["ok"], false);
}

#[test]
fn delete_removes_the_workspace() {
    let home = storage_home();
    run_json(&home, &["--at", "#tmp", "set", "code", "return 1"]);
    let (code, deleted) = run_json(&home, &["--at", "#tmp", "delete"]);
    assert_eq!(code, 0);
    assert_eq!(deleted["message"], "morph delete: deleted #tmp");
    let (_, listed) = run_json(&home, &["list"]);
    assert_eq!(listed["details"]["workspaces"], json!([]));
}

#[test]
fn gist_errors_are_user_errors() {
    let home = storage_home();
    let (code, pushed) = run_json(&home, &["--at", "#g", "gist", "push"]);
    assert_eq!(code, 1, "{pushed}");
    assert_eq!(pushed["status"], "user-error");
    assert_eq!(pushed["details"]["reason"], "no_gist_linked");

    run_json(&home, &["--at", "#g", "gist", "link", "abc123"]);
    let (code, pulled) = run_json(&home, &["--at", "#g", "gist", "pull", "--yes"]);
    assert_eq!(code, 1, "{pulled}");
    assert_eq!(pulled["details"]["reason"], "offline");
}

#[test]
fn human_output_prints_status_and_result() {
    let home = storage_home();
    let assert = morph_cmd(&home)
        .args(["--at", "#h", "set", "json", "[5]"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    assert!(stdout.contains("✔ morph set: updated json of #h"), "{stdout}");
    assert!(stdout.contains("[\n  5\n]"), "{stdout}");
}
