//! Integration tests for the dbgraph CLI.
//!
//! These tests run the built binary against snapshot and plan files in a
//! temporary directory.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use rstest::{fixture, rstest};
use tempfile::TempDir;

// ============================================================================
// Test Fixtures
// ============================================================================

const SNAPSHOT: &str = r#"{
    "nodes": [
        {"schema": "public", "name": "users", "type": "table", "size": "64 kB", "row_count": 800},
        {"schema": "public", "name": "orders", "type": "table", "size": "2 MB", "row_count": 5000},
        {"schema": "public", "name": "v_orders", "type": "view"},
        {"schema": "public", "name": "categories", "type": "table"}
    ],
    "indexes": [
        {"schema": "public", "table": "orders", "columns": ["user_id", "created_at"]}
    ],
    "foreign_keys": [
        {"schema": "public", "table": "orders", "ref_schema": "public", "ref_table": "users",
         "constraint_name": "orders_user_id_fkey", "delete_rule": "CASCADE", "columns": ["user_id"]},
        {"schema": "public", "table": "categories", "ref_schema": "public", "ref_table": "categories",
         "constraint_name": "categories_parent_fkey", "columns": ["parent_id"]}
    ],
    "view_dependencies": [
        {"view_schema": "public", "view_name": "v_orders", "table_schema": "public", "table_name": "orders"}
    ]
}"#;

const PLAN: &str = r#"[{
    "Plan": {
        "Node Type": "Seq Scan", "Relation Name": "orders",
        "Startup Cost": 0.0, "Total Cost": 12.5, "Plan Rows": 250,
        "Shared Hit Blocks": 8, "Shared Read Blocks": 0
    },
    "Planning Time": 0.05,
    "Execution Time": 0.4
}]"#;

/// A temporary directory holding `snapshot.json` and `plan.json`.
#[fixture]
fn workspace() -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp directory");
    fs::write(temp.path().join("snapshot.json"), SNAPSHOT).unwrap();
    fs::write(temp.path().join("plan.json"), PLAN).unwrap();
    temp
}

fn run_dbgraph(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dbgraph"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env("DBGRAPH_ASCII", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute dbgraph")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn help_lists_all_commands() {
    let output = run_dbgraph(Path::new("."), &["--help"]);
    assert!(output.status.success());
    let out = stdout(&output);
    for command in ["analyze", "summary", "impact", "cycles", "trace"] {
        assert!(out.contains(command), "help is missing {command}: {out}");
    }
}

#[test]
fn version_matches_package() {
    let output = run_dbgraph(Path::new("."), &["--version"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

// ============================================================================
// Graph Commands
// ============================================================================

#[rstest]
fn analyze_reports_health(workspace: TempDir) {
    let output = run_dbgraph(workspace.path(), &["--snapshot", "snapshot.json", "analyze"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let out = stdout(&output);
    assert!(out.contains("Objects: 4"));
    assert!(out.contains("CRITICAL: Found 1 circular dependencies"));
    assert!(out.contains("1. public.categories -> public.categories"));
    assert!(out.contains("public.categories(parent_id) -> public.categories"));
}

#[rstest]
fn summary_respects_limit(workspace: TempDir) {
    let output = run_dbgraph(
        workspace.path(),
        &["--snapshot", "snapshot.json", "summary", "--limit", "1"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let out = stdout(&output);
    assert!(out.contains("public.categories"));
    assert!(out.contains("... and 3 more. Use --all or --limit to see more."));
}

#[rstest]
fn impact_resolves_bare_names(workspace: TempDir) {
    let output = run_dbgraph(workspace.path(), &["--snapshot", "snapshot.json", "impact", "users"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let out = stdout(&output);
    assert!(out.contains("Target: public.users (800 rows)"));
    assert!(out.contains("`-- T public.orders (5.0k rows) [FK: orders_user_id_fkey] (CASCADE)"));
    assert!(out.contains("    `-- V public.v_orders (View)"));
    assert!(out.contains("[High] Cascade Delete"));
    assert!(!out.contains("Missing Index"));
}

#[rstest]
fn impact_json_is_machine_readable(workspace: TempDir) {
    let output = run_dbgraph(
        workspace.path(),
        &["--snapshot", "snapshot.json", "--json", "impact", "public.users"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["total_affected"], 2);
    assert_eq!(report["max_depth"], 2);
    assert_eq!(report["root"]["children"][0]["id"], "public.orders");
}

#[rstest]
fn unknown_impact_target_fails(workspace: TempDir) {
    let output = run_dbgraph(workspace.path(), &["--snapshot", "snapshot.json", "impact", "nope"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("object not found in graph: nope"));
}

#[rstest]
fn cycles_json_lists_members(workspace: TempDir) {
    let output = run_dbgraph(
        workspace.path(),
        &["--snapshot", "snapshot.json", "--json", "cycles"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let cycles: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(cycles[0]["nodes"][0], "public.categories");
}

#[rstest]
fn missing_snapshot_flag_fails(workspace: TempDir) {
    let output = run_dbgraph(workspace.path(), &["cycles"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("--snapshot"));
}

#[rstest]
fn unreadable_snapshot_shows_cause(workspace: TempDir) {
    let output = run_dbgraph(workspace.path(), &["--snapshot", "absent.json", "analyze"]);
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("failed to load schema snapshot absent.json"));
    assert!(err.contains("caused by"));
}

// ============================================================================
// Configuration
// ============================================================================

#[rstest]
fn config_file_is_discovered(workspace: TempDir) {
    fs::write(workspace.path().join(".dbgraph.yaml"), "coupling_threshold: 2\n").unwrap();
    let output = run_dbgraph(workspace.path(), &["--snapshot", "snapshot.json", "analyze"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("COMPLEXITY RISKS"));
}

#[rstest]
fn invalid_config_fails(workspace: TempDir) {
    fs::write(workspace.path().join("bad.yaml"), "coupling_threshold: 0\n").unwrap();
    let output = run_dbgraph(
        workspace.path(),
        &["--snapshot", "snapshot.json", "--config", "bad.yaml", "analyze"],
    );
    assert!(!output.status.success());
    assert!(stderr(&output).contains("coupling_threshold must be at least 1"));
}

// ============================================================================
// Plan Trace
// ============================================================================

#[rstest]
fn trace_reports_warm_cache(workspace: TempDir) {
    let output = run_dbgraph(workspace.path(), &["trace", "plan.json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let out = stdout(&output);
    assert!(out.contains("Total Time:      0.45 ms"));
    assert!(out.contains("Cache Hits:      8  (100.0%)"));
    assert!(out.contains("[ok] Warm"));
    assert!(out.contains("Seq Scan on orders (cost=0.00..12.50 rows=250)"));
    assert!(out.contains("Seq Scan on 'orders' reads the whole table."));
}
