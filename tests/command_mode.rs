//! Integration tests for the gridcalc command line

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

fn gridcalc(data_dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_gridcalc"));
    // Tests must be deterministic and not depend on a user's config file.
    let config = data_dir.join("config.toml");
    if !config.exists() {
        std::fs::write(&config, "").expect("Failed to write config");
    }
    cmd.arg("--config").arg(config).arg("--data-dir").arg(data_dir);
    cmd.env_remove("RUST_LOG");
    cmd
}

fn run_command(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = gridcalc(data_dir)
        .args(args)
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    (stdout, stderr, exit_code)
}

fn json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout).expect("stdout should be JSON")
}

#[test]
fn test_eval_arithmetic() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_command(dir.path(), &["eval", "5 + 3 * 2"]);
    assert_eq!(stdout.trim(), "11");
    assert_eq!(code, 0);
}

#[test]
fn test_eval_auto_strips_equals() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout1, _, _) = run_command(dir.path(), &["eval", "10 / 4"]);
    let (stdout2, _, _) = run_command(dir.path(), &["eval", "=10 / 4"]);
    assert_eq!(stdout1.trim(), "2.5");
    assert_eq!(stdout1, stdout2);
}

#[test]
fn test_eval_error_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_command(dir.path(), &["eval", "1/0"]);
    assert_eq!(stdout.trim(), "#ERR");
    assert_eq!(code, 1);
}

#[test]
fn test_set_then_get() {
    let dir = tempfile::tempdir().unwrap();
    let (_, _, code) = run_command(dir.path(), &["set", "budget", "A1", "5"]);
    assert_eq!(code, 0);

    let (stdout, _, code) = run_command(dir.path(), &["set", "budget", "B1", "=A1+1"]);
    assert_eq!(code, 0);
    assert_eq!(json(&stdout)["changedCells"][0]["computedValue"], "6");

    let (stdout, _, code) = run_command(dir.path(), &["set", "budget", "A1", "10"]);
    assert_eq!(code, 0);
    let result = json(&stdout);
    assert_eq!(result["changedCells"][1]["cellCoordinate"], "B1");
    assert_eq!(result["changedCells"][1]["computedValue"], "11");

    let (stdout, _, code) = run_command(dir.path(), &["get", "budget"]);
    assert_eq!(code, 0);
    assert_eq!(json(&stdout)["gridData"]["B1"]["computedValue"], "11");
    assert!(dir.path().join("budget.grd").exists());
}

#[test]
fn test_eval_against_stored_grid() {
    let dir = tempfile::tempdir().unwrap();
    run_command(dir.path(), &["set", "g", "A1", "3"]);
    run_command(dir.path(), &["set", "g", "A2", "4"]);
    let (stdout, _, code) = run_command(dir.path(), &["eval", "--grid", "g", "SUM(A1:A2)*A2"]);
    assert_eq!(stdout.trim(), "28");
    assert_eq!(code, 0);
}

#[test]
fn test_invalid_cell_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_command(dir.path(), &["set", "g", "1A", "3"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Invalid cell reference: 1A"));
}

#[test]
fn test_handle_reads_events_from_stdin() {
    let dir = tempfile::tempdir().unwrap();
    let mut child = gridcalc(dir.path())
        .arg("--memory")
        .arg("handle")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("Failed to spawn");

    {
        let stdin = child.stdin.as_mut().unwrap();
        writeln!(stdin, r#"{{"operation":"update_cell","gridFileId":"g","cellCoordinate":"A1","rawValue":"=2+2"}}"#).unwrap();
        writeln!(stdin, r#"{{"operation":"get_grid_data","gridFileId":"g"}}"#).unwrap();
        writeln!(stdin, r#"{{"operation":"drop_table"}}"#).unwrap();
    }
    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    let responses: Vec<serde_json::Value> = stdout.lines().map(json).collect();

    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["statusCode"], 200);
    assert_eq!(responses[1]["body"]["gridData"]["A1"]["computedValue"], "4");
    assert_eq!(responses[2]["statusCode"], 400);
    assert_eq!(responses[2]["body"]["error"], "Invalid operation");
    // Memory store never touches the data dir
    assert!(!dir.path().join("g.grd").exists());
}
