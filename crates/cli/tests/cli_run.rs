// End-to-end tests for `keylink run`, `validate` and `score`.
// Run with: cargo test -p keylink-cli --test cli_run

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use keylink_match::Value;
use tempfile::TempDir;

fn keylink() -> Command {
    Command::new(env!("CARGO_BIN_EXE_keylink"))
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

/// Copy the fixture tables into a scratch directory so outputs land there.
fn workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for name in ["master.csv", "erp.csv", "previous_master.csv", "vendors.toml"] {
        fs::copy(fixture(name), dir.path().join(name)).unwrap();
    }
    dir
}

fn write_job(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("job.toml");
    fs::write(&path, body).unwrap();
    path
}

fn run(args: &[&str]) -> Output {
    keylink().args(args).output().unwrap()
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn job_path(dir: &TempDir) -> String {
    dir.path().join("vendors.toml").display().to_string()
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

#[test]
fn run_lists_every_result_and_writes_outputs() {
    let dir = workspace();
    let out = run(&["run", &job_path(&dir), "--today", "2026-01-15"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let lines: Vec<String> = stdout(&out).lines().map(str::to_string).collect();
    assert_eq!(
        lines,
        vec![
            "   1  auto     [ ]  100.0  John Smith  ->  SMITH JOHN  (erp.csv)",
            "   2  nomatch  [x]   33.3  Acme Corp  ->  ACME CORPORATION  (erp.csv)",
            "   3  review   [ ]   66.7  Globex Holdings  ->  GLOBEX HOLDINGS INC  (erp.csv)",
        ]
    );

    let err = stderr(&out);
    assert!(err.contains("3 rows: 1 auto, 1 review, 0 no match, 1 confirmed"), "{err}");
    assert!(err.contains("merged 2 rows: 1 updated, 1 not updated"), "{err}");

    let mapping = fs::read_to_string(dir.path().join("Mapping_Results.csv")).unwrap();
    assert_eq!(
        mapping,
        "Master Key,Best Match,Confidence,Status,Confirmed,Supplier ID,Terms\n\
         John Smith,SMITH JOHN,100,auto,No,S-001,NET30\n\
         Acme Corp,ACME CORPORATION,33,nomatch,Yes,S-002,NET45\n\
         Globex Holdings,GLOBEX HOLDINGS INC,67,review,No,S-003,NET60\n"
    );

    let merged = fs::read_to_string(dir.path().join("Merged_Master.csv")).unwrap();
    assert_eq!(
        merged,
        "Vendor Name,Region,Terms,Supplier ID,MatchConfidence,Confirmed,LastUpdated,UpdateStatus\n\
         Acme Corp,West,NET45,S-002,33,Yes,2026-01-15,Updated\n\
         Initech,South,NET15,,,,,Not Updated\n"
    );
}

#[test]
fn updated_master_is_written_as_xlsx() {
    let dir = workspace();
    let out = run(&["run", &job_path(&dir), "--quiet"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let table = keylink_io::load_table(&dir.path().join("Updated_Master.xlsx")).unwrap();
    assert_eq!(table.rows.len(), 3);
    let globex = &table.rows[2];
    assert_eq!(globex["Vendor Name"], Value::from("Globex Holdings"));
    assert_eq!(globex["MatchConfidence"], Value::Number(67.0));
    assert_eq!(globex["Terms_Updated"], Value::from("NET60"));
    assert_eq!(globex["Confirmed"], Value::from("No"));
}

#[test]
fn filter_flag_limits_listed_results() {
    let dir = workspace();
    let out = run(&["run", &job_path(&dir), "--filter", "review", "--dry-run"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert_eq!(text.lines().count(), 1);
    assert!(text.contains("Globex Holdings"));

    let out = run(&["run", &job_path(&dir), "--filter", "confirmed", "--dry-run"]);
    assert!(stdout(&out).contains("Acme Corp"));
    assert_eq!(stdout(&out).lines().count(), 1);
}

#[test]
fn dry_run_writes_nothing() {
    let dir = workspace();
    let out = run(&["run", &job_path(&dir), "--dry-run", "--quiet"]);
    assert!(out.status.success());
    assert!(!dir.path().join("Mapping_Results.csv").exists());
    assert!(!dir.path().join("Merged_Master.csv").exists());
    assert!(stderr(&out).is_empty());
}

#[test]
fn json_report_contract() {
    let dir = workspace();
    let out = run(&["run", &job_path(&dir), "--json", "--dry-run", "--quiet"]);
    assert!(out.status.success());

    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["name"], "Vendor cleanup");
    assert_eq!(report["stats"]["total"], 3);
    assert_eq!(report["stats"]["confirmed"], 1);

    let results = report["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[1]["master_key"], "Acme Corp");
    assert_eq!(results[1]["confirmed"], true);
    assert_eq!(results[1]["best_match"]["score"], 33.3);
    assert_eq!(results[2]["status"], "review");
    assert_eq!(results[2]["alternatives"].as_array().unwrap().len(), 2);
}

#[test]
fn job_filter_applies_when_flag_is_absent() {
    let dir = workspace();
    let job = write_job(
        &dir,
        r#"
[master]
file = "master.csv"

[[sources]]
file = "erp.csv"
fields = ["Terms"]

[output]
filter = "auto"
"#,
    );
    let out = run(&["run", job.to_str().unwrap(), "--quiet"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out).lines().count(), 1);
    assert!(stdout(&out).contains("John Smith"));
}

// ---------------------------------------------------------------------------
// failures and exit codes
// ---------------------------------------------------------------------------

#[test]
fn source_without_fields_is_refused() {
    let dir = workspace();
    let job = write_job(
        &dir,
        r#"
[master]
file = "master.csv"

[[sources]]
file = "erp.csv"
"#,
    );
    let out = run(&["run", job.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(4));
    let err = stderr(&out);
    assert!(err.contains("error: no active source"), "{err}");
    assert!(err.contains("hint:"), "{err}");
}

#[test]
fn unknown_key_column_lists_available_columns() {
    let dir = workspace();
    let job = write_job(
        &dir,
        r#"
[master]
file = "master.csv"
key = "Vendor"

[[sources]]
file = "erp.csv"
fields = ["Terms"]
"#,
    );
    let out = run(&["run", job.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(3));
    assert!(stderr(&out).contains("master.csv has columns: Vendor Name, Region"));
}

#[test]
fn missing_table_is_a_read_error() {
    let dir = workspace();
    let job = write_job(
        &dir,
        r#"
[master]
file = "nowhere.csv"

[[sources]]
file = "erp.csv"
fields = ["Terms"]
"#,
    );
    let out = run(&["run", job.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(5));
}

#[test]
fn header_only_master_is_refused() {
    let dir = workspace();
    fs::write(dir.path().join("empty.csv"), "Vendor Name\n").unwrap();
    let job = write_job(
        &dir,
        r#"
[master]
file = "empty.csv"

[[sources]]
file = "erp.csv"
fields = ["Terms"]
"#,
    );
    let out = run(&["run", job.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(4));
    assert!(stderr(&out).contains("master dataset is empty"));
}

#[test]
fn unwritable_output_is_a_write_error() {
    let dir = workspace();
    let job = write_job(
        &dir,
        r#"
[master]
file = "master.csv"

[[sources]]
file = "erp.csv"
fields = ["Terms"]

[output]
mapping = "missing_dir/Mapping_Results.csv"
"#,
    );
    let out = run(&["run", job.to_str().unwrap(), "--quiet"]);
    assert_eq!(out.status.code(), Some(6));
}

// ---------------------------------------------------------------------------
// validate / score / usage
// ---------------------------------------------------------------------------

#[test]
fn validate_accepts_fixture_job() {
    let dir = workspace();
    let out = run(&["validate", &job_path(&dir)]);
    assert!(out.status.success());
    assert!(stderr(&out).contains("valid: job 'Vendor cleanup' with 1 source(s), 3 output(s)"));
}

#[test]
fn validate_rejects_merge_without_previous_master() {
    let dir = workspace();
    let job = write_job(
        &dir,
        r#"
[master]
file = "master.csv"

[[sources]]
file = "erp.csv"

[output]
merged = "Merged.csv"
"#,
    );
    let out = run(&["validate", job.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(3));
}

#[test]
fn validate_rejects_unknown_keys() {
    let dir = workspace();
    let job = write_job(&dir, "[master]\nfile = \"master.csv\"\nsheet = 2\n\n[[sources]]\nfile = \"erp.csv\"\n");
    let out = run(&["validate", job.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(3));
    assert!(stderr(&out).contains("parse error"));
}

#[test]
fn score_prints_value_and_status() {
    let out = run(&["score", "Acme Corp", "ACME CORPORATION"]);
    assert!(out.status.success());
    assert_eq!(stdout(&out), "33.3 nomatch\n");

    let out = run(&["score", "John Smith", "smith  john"]);
    assert_eq!(stdout(&out), "100.0 auto\n");

    let out = run(&["score", "", ""]);
    assert_eq!(stdout(&out), "0.0 nomatch\n");
}

#[test]
fn bad_filter_is_a_usage_error() {
    let dir = workspace();
    let out = run(&["run", &job_path(&dir), "--filter", "maybe"]);
    assert_eq!(out.status.code(), Some(2));
}
