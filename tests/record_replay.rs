//! Replay integration tests.
//!
//! Cassettes are written the way a `TEKBUMP_RECORD` session lays them out,
//! then the binary is run with `TEKBUMP_REPLAY` pointing at them. No
//! network access or `skopeo` install is needed.

use std::path::Path;
use std::process::{Command, Output};

use serde_json::{json, Value};

use tekbump::cassette::recorder::CassetteRecorder;
use tekbump::cassette::session::cassette_path;
use tekbump::context::ServiceContext;

const OLD: &str = "sha256:1111111111111111111111111111111111111111111111111111111111111111";
const NEW: &str = "sha256:2222222222222222222222222222222222222222222222222222222222222222";
const PREVIOUS: &str = "sha256:3333333333333333333333333333333333333333333333333333333333333333";

fn recorder(dir: &Path, port: &str) -> CassetteRecorder {
    CassetteRecorder::new(cassette_path(dir, port), &format!("test-{port}"), "abc123")
}

fn replay(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tekbump"))
        .args(args)
        .env("TEKBUMP_REPLAY", dir)
        .env_remove("TEKBUMP_RECORD")
        .output()
        .expect("failed to run tekbump binary")
}

fn ec_log() -> String {
    let warning = format!(
        r#"{{"msg":"A newer version of task \"init\" exists. Please update before 2026-11-01T00:00:00Z. The current bundle is \"oci://quay.io/konflux-ci/tekton-catalog/task-init:0.2@{OLD}\" and the latest bundle ref is \"{NEW}\"","metadata":{{"code":"trusted_task.current"}}}}"#
    );
    format!("step-validate\nSTEP-REPORT-JSON\n{{\"components\":[{{\"warnings\":[{warning}]}}]}}\n")
}

#[test]
fn lookup_replays_registry_by_request() {
    let dir = tempfile::tempdir().unwrap();

    let mut fs = recorder(dir.path(), "fs");
    fs.record("fs", "exists", json!({"path": "ec.log"}), json!(true));
    fs.record("fs", "read_to_string", json!({"path": "ec.log"}), json!({"ok": ec_log()}));
    fs.finish().unwrap();

    let repo = "konflux-ci/tekton-catalog/task-init";
    let mut registry = recorder(dir.path(), "registry");
    registry.record(
        "registry",
        "list_tags",
        json!({"repository": repo}),
        json!({"ok": ["0.2", "latest", "0.1"]}),
    );
    registry.record(
        "registry",
        "manifest_digest",
        json!({"repository": repo, "tag": "0.2"}),
        json!({"ok": NEW}),
    );
    registry.record(
        "registry",
        "manifest_digest",
        json!({"repository": repo, "tag": "0.1"}),
        json!({"ok": PREVIOUS}),
    );
    registry.finish().unwrap();

    let output = replay(dir.path(), &["lookup", "ec.log"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let results: Value = serde_json::from_slice(&output.stdout).unwrap();
    let init = &results[0];
    assert_eq!(init["task_name"], "init");
    assert_eq!(init["available_versions"], json!(["0.1", "0.2"]));
    assert_eq!(init["target_version"], "0.2");
    assert_eq!(init["target_digest"], NEW);
    assert_eq!(init["version_source"], "digest_match");
    assert_eq!(init["is_version_bump"], false);
    assert!(init.get("error").is_none());
}

fn catalog_fs(dir: &Path, pipeline: &str) {
    let manifest = r#"{"layers":[{"digest":"sha256:d00d","annotations":{"org.opencontainers.image.title":"trusted_tekton_tasks.yml"}}]}"#;
    let catalog = format!(
        "trusted_tasks:\n  oci://quay.io/konflux-ci/tekton-catalog/task-init:0.2:\n    - ref: {NEW}\n    - ref: {OLD}\n      expires_on: 2026-11-01T00:00:00Z\n"
    );

    // fs calls are served in order per method.
    let mut fs = recorder(dir, "fs");
    fs.record("fs", "exists", json!({"path": "pipeline.yaml"}), json!(true));
    fs.record("fs", "exists", json!({"path": "manifest.json"}), json!(true));
    fs.record("fs", "read_to_string", json!({"path": "manifest.json"}), json!({"ok": manifest}));
    fs.record("fs", "exists", json!({"path": "d00d"}), json!(true));
    fs.record("fs", "read_to_string", json!({"path": "d00d"}), json!({"ok": catalog}));
    fs.record("fs", "read_to_string", json!({"path": "pipeline.yaml"}), json!({"ok": pipeline}));
    fs.finish().unwrap();

    let mut commands = recorder(dir, "commands");
    commands.record(
        "commands",
        "run",
        json!({"program": "skopeo", "args": []}),
        json!({"ok": {"exit_code": 0, "stdout": "", "stderr": ""}}),
    );
    commands.finish().unwrap();
}

#[test]
fn update_dry_run_reports_pending_changes() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = format!(
        "spec:\n  tasks:\n    - name: init\n      taskRef:\n        params:\n          - name: bundle\n            value: quay.io/konflux-ci/tekton-catalog/task-init:0.2@{OLD}\n"
    );
    catalog_fs(dir.path(), &pipeline);

    let output = replay(dir.path(), &["update", "--dry-run", "--diff", "pipeline.yaml"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(1), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("Found 1 task(s) needing updates (dry-run)"));
    assert!(stdout.contains(&format!("+            value: quay.io/konflux-ci/tekton-catalog/task-init:0.2@{NEW}")));
}

#[test]
fn update_up_to_date_pipeline_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = format!(
        "spec:\n  tasks:\n    - name: init\n      taskRef:\n        params:\n          - name: bundle\n            value: quay.io/konflux-ci/tekton-catalog/task-init:0.2@{NEW}\n"
    );
    catalog_fs(dir.path(), &pipeline);

    let output = replay(dir.path(), &["update", "--dry-run", "pipeline.yaml"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("All task bundles are up to date!"));
}

#[test]
fn replaying_context_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let mut fs = recorder(dir.path(), "fs");
    fs.record("fs", "read_to_string", json!({"path": "a"}), json!({"ok": "first"}));
    fs.finish().unwrap();

    for _ in 0..2 {
        let ctx = ServiceContext::replaying(dir.path()).unwrap();
        assert_eq!(ctx.fs.read_to_string(Path::new("a")).unwrap(), "first");
    }
}
