//! End-to-end tests driving the `td` binary against a temporary database.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn td(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_td"))
        .env("HOME", home)
        .env_remove("XDG_CONFIG_HOME")
        .env_remove("RUST_LOG")
        .env("TD_DATABASE_PATH", home.join("td.db"))
        .env("TZ", "UTC")
        .args(args)
        .output()
        .expect("failed to run td")
}

fn stdout_of(home: &Path, args: &[&str]) -> String {
    let output = td(home, args);
    assert!(
        output.status.success(),
        "td {args:?} should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn timer_state_survives_between_invocations() {
    let temp = TempDir::new().unwrap();
    let home = temp.path();

    let started = stdout_of(home, &["start", "Work"]);
    assert!(started.starts_with("Started Work at "), "{started}");

    let status = stdout_of(home, &["status"]);
    assert!(status.contains("Timer:     running"), "{status}");
    assert!(status.contains("Work"), "{status}");

    let stopped = stdout_of(home, &["stop"]);
    assert!(stopped.contains("Work"), "{stopped}");

    let status = stdout_of(home, &["status"]);
    assert!(status.contains("Timer:     idle"), "{status}");
    assert!(home.join("td.db").exists());
}

#[test]
fn manual_entry_is_exported() {
    let temp = TempDir::new().unwrap();
    let home = temp.path();

    let added = stdout_of(
        home,
        &[
            "add",
            "Work",
            "--start",
            "2024-01-01 09:00",
            "--end",
            "2024-01-01 09:30",
        ],
    );
    assert!(added.starts_with("Added "), "{added}");

    let csv = stdout_of(home, &["export"]);
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("Date,Category,Start Time,End Time,Duration (minutes)")
    );
    assert_eq!(lines.next(), Some("2024-01-01,Work,09:00:00,09:30:00,30"));
    assert_eq!(lines.next(), None);
}

#[test]
fn invalid_requests_fail_without_changing_data() {
    let temp = TempDir::new().unwrap();
    let home = temp.path();

    let output = td(home, &["start", "NoSuchCategory"]);
    assert!(!output.status.success());

    let output = td(home, &["categories", "delete", "Work"]);
    assert!(!output.status.success());
    let listing = stdout_of(home, &["categories", "list"]);
    assert!(listing.starts_with("Work "), "{listing}");

    let output = td(
        home,
        &[
            "add",
            "Work",
            "--start",
            "2024-01-01 10:00",
            "--end",
            "2024-01-01 09:00",
        ],
    );
    assert!(!output.status.success());
    let csv = stdout_of(home, &["export"]);
    assert_eq!(csv.lines().count(), 1);
}

#[test]
fn reset_clears_everything_but_default_categories() {
    let temp = TempDir::new().unwrap();
    let home = temp.path();

    stdout_of(
        home,
        &[
            "add",
            "Rest",
            "--start",
            "2024-01-01 13:00",
            "--end",
            "2024-01-01 14:00",
        ],
    );
    stdout_of(home, &["categories", "add", "Reading"]);

    let output = td(home, &["reset"]);
    assert!(!output.status.success(), "reset needs --yes");
    assert_eq!(stdout_of(home, &["export"]).lines().count(), 2);

    assert_eq!(stdout_of(home, &["reset", "--yes"]), "All data cleared\n");
    assert_eq!(stdout_of(home, &["export"]).lines().count(), 1);
    let listing = stdout_of(home, &["categories", "list"]);
    assert_eq!(listing.lines().count(), 8);
    assert!(!listing.contains("Reading"));
}
