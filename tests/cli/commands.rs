//! Running the binary against fixture files

use std::path::Path;
use std::process::{Command, Output};

use scanhub::scan::api::{Fixture, ScanId, ScanState};
use tempfile::TempDir;

const FIXTURE: &str = r#"{
    "scans": [
        {"id": 1, "nvr": "sed-4.2.2-5.el7", "package": "sed", "release": "rhel-7",
         "scan_type": "ERRATA", "state": "NEEDS_INSPECTION", "enabled": true, "task": 10,
         "last_access": "2020-01-01T00:00:00Z", "submitted_at": "2020-01-01T00:00:00Z"},
        {"id": 2, "nvr": "sed-4.2.2-7.el7", "package": "sed", "release": "rhel-7",
         "scan_type": "ERRATA", "state": "SCANNING", "enabled": true, "task": 11,
         "last_access": "2020-02-01T00:00:00Z", "submitted_at": "2020-02-01T00:00:00Z"}
    ],
    "tasks": [{"id": 10, "state": "CLOSED"}, {"id": 11, "state": "OPEN"}],
    "results": [{"scan": 2, "unwaived_groups": 0}]
}"#;

const SETTINGS: &str = "[notifications]\nsend_bus_message = true\n\n[waivers]\noverdue_days = 7\n";

fn workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("scans.json"), FIXTURE).unwrap();
    std::fs::write(dir.path().join("hub.toml"), SETTINGS).unwrap();
    dir
}

fn scanhub(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_scanhub"))
        .arg("--no-color")
        .arg("--config-file")
        .arg(dir.join("hub.toml"))
        .arg("--fixture")
        .arg(dir.join("scans.json"))
        .args(args)
        .output()
        .unwrap()
}

fn reload(dir: &Path) -> Fixture {
    let json = std::fs::read_to_string(dir.join("scans.json")).unwrap();
    serde_json::from_str(&json).unwrap()
}

fn state_of(fixture: &Fixture, id: u64) -> ScanState {
    fixture
        .scans
        .iter()
        .find(|s| s.id == ScanId(id))
        .unwrap()
        .state
}

#[test]
fn test_show_lists_scans() {
    let dir = workspace();
    let output = scanhub(dir.path(), &["show"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("sed-4.2.2-5.el7"));
    assert!(stdout.contains("NEEDS_INSPECTION"));
}

#[test]
fn test_finish_writes_back() {
    let dir = workspace();
    let output = scanhub(dir.path(), &["--write", "finish", "2", "11"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("notice: #2 PASSED finished"), "{stdout}");
    assert_eq!(state_of(&reload(dir.path()), 2), ScanState::Passed);
}

#[test]
fn test_without_write_fixture_is_untouched() {
    let dir = workspace();
    let output = scanhub(dir.path(), &["cancel", "2"]);
    assert!(output.status.success());
    assert_eq!(state_of(&reload(dir.path()), 2), ScanState::Scanning);
}

#[test]
fn test_overdue_reports_deadline() {
    let dir = workspace();
    let output = scanhub(dir.path(), &["overdue", "1"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("#1 waiver deadline: overdue"));
}

#[test]
fn test_illegal_event_fails() {
    let dir = workspace();
    let output = scanhub(dir.path(), &["--write", "invalidate", "2"]);
    assert!(!output.status.success());
    assert_eq!(state_of(&reload(dir.path()), 2), ScanState::Scanning);
}

#[test]
fn test_unknown_scan_fails() {
    let dir = workspace();
    let output = scanhub(dir.path(), &["queue", "42"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_missing_settings_file_fails() {
    let dir = workspace();
    let output = Command::new(env!("CARGO_BIN_EXE_scanhub"))
        .args(["--config-file", "/nonexistent/hub.toml", "--fixture"])
        .arg(dir.path().join("scans.json"))
        .arg("show")
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_unreachable_task_keeps_cancel() {
    let dir = workspace();
    // task 11 is unknown to the task queue
    let fixture = FIXTURE.replace(r#", {"id": 11, "state": "OPEN"}"#, "");
    std::fs::write(dir.path().join("scans.json"), fixture).unwrap();

    let output = scanhub(dir.path(), &["--write", "cancel", "2"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(state_of(&reload(dir.path()), 2), ScanState::Canceled);
}
