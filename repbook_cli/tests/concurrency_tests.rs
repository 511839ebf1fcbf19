//! Concurrency tests for repbook.
//!
//! These tests verify that multiple processes can safely:
//! - Append to the performance log simultaneously (file locking)
//! - Read history while sessions are being saved
//! - Rewrite the schedule while other processes read it
//! - Edit the schedule and date overrides from several processes at once

use assert_cmd::Command;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn cli() -> Command {
    Command::cargo_bin("repbook").expect("Failed to find repbook binary")
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn count_log_lines(data_dir: &std::path::Path) -> usize {
    let content = std::fs::read_to_string(data_dir.join("performances.jsonl"))
        .expect("Failed to read performance log");
    content.lines().filter(|l| !l.is_empty()).count()
}

#[test]
fn test_sequential_session_logging() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    for i in 0..5 {
        thread::sleep(Duration::from_millis(i * 5));
        cli()
            .args(["start", "hiit_circuit", "--auto-complete"])
            .arg("--data-dir")
            .arg(&data_dir)
            .assert()
            .success();
    }

    assert_eq!(count_log_lines(&data_dir), 5);
}

#[test]
fn test_history_reads_while_writing() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    cli()
        .args(["start", "leg_day", "--auto-complete"])
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success();

    let reader_dir = data_dir.clone();
    let reader = thread::spawn(move || {
        for _ in 0..3 {
            cli()
                .arg("history")
                .arg("--data-dir")
                .arg(&reader_dir)
                .assert()
                .success();
            thread::sleep(Duration::from_millis(5));
        }
    });

    for _ in 0..3 {
        cli()
            .args(["start", "upper_push", "--auto-complete"])
            .arg("--data-dir")
            .arg(&data_dir)
            .assert()
            .success();
    }

    reader.join().expect("Reader thread panicked");
    assert_eq!(count_log_lines(&data_dir), 4);
}

#[test]
fn test_no_log_corruption_under_load() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let data_dir = data_dir.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(i * 5));
                cli()
                    .args(["start", "mobility_flow", "--auto-complete"])
                    .arg("--data-dir")
                    .arg(&data_dir)
                    .timeout(Duration::from_secs(10))
                    .assert()
                    .success();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let content = std::fs::read_to_string(data_dir.join("performances.jsonl"))
        .expect("Failed to read performance log");

    let mut valid_count = 0;
    for line in content.lines() {
        if line.is_empty() {
            continue;
        }
        let parsed: Result<serde_json::Value, _> = serde_json::from_str(line);
        assert!(parsed.is_ok(), "Log contains invalid JSON line: {}", line);
        valid_count += 1;
    }

    assert_eq!(valid_count, 10, "Expected 10 valid performances in log");
}

#[test]
fn test_schedule_writes_with_concurrent_reads() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    // First read creates the document
    cli()
        .args(["schedule", "show"])
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let data_dir = data_dir.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(i * 5));
                cli()
                    .args(["schedule", "show"])
                    .arg("--data-dir")
                    .arg(&data_dir)
                    .timeout(Duration::from_secs(10))
                    .assert()
                    .success();
            })
        })
        .collect();

    for day in ["Monday", "Wednesday", "Friday"] {
        cli()
            .args(["schedule", "set", day, "leg_day"])
            .arg("--data-dir")
            .arg(&data_dir)
            .assert()
            .success();
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    // Schedule file is always a complete document
    let content = std::fs::read_to_string(data_dir.join("schedule.json"))
        .expect("Failed to read schedule");
    let doc: serde_json::Value = serde_json::from_str(&content).expect("Schedule is valid JSON");
    let days = doc["days"].as_array().expect("days array");
    assert_eq!(days.len(), 7);
    let planned = days
        .iter()
        .filter(|d| !d["workouts"].as_array().unwrap().is_empty())
        .count();
    assert_eq!(planned, 3);
}

#[test]
fn test_concurrent_date_overrides_keep_every_date() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    let handles: Vec<_> = (1..=8)
        .map(|day| {
            let data_dir = data_dir.clone();
            thread::spawn(move || {
                cli()
                    .args(["date", "set", &format!("2024-05-{:02}", day), "leg_day"])
                    .arg("--data-dir")
                    .arg(&data_dir)
                    .timeout(Duration::from_secs(10))
                    .assert()
                    .success();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let content = std::fs::read_to_string(data_dir.join("date_overrides.json"))
        .expect("Failed to read overrides");
    let doc: serde_json::Value = serde_json::from_str(&content).expect("Overrides are valid JSON");
    let dates = doc.as_object().expect("date map");
    assert_eq!(dates.len(), 8, "Lost updates: {:?}", dates.keys().collect::<Vec<_>>());
}

#[test]
fn test_concurrent_schedule_edits_keep_every_day() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();
    let days = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"];

    let handles: Vec<_> = days
        .iter()
        .map(|day| {
            let data_dir = data_dir.clone();
            let day = day.to_string();
            thread::spawn(move || {
                cli()
                    .args(["schedule", "set", &day, "hiit_circuit"])
                    .arg("--data-dir")
                    .arg(&data_dir)
                    .timeout(Duration::from_secs(10))
                    .assert()
                    .success();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let content = std::fs::read_to_string(data_dir.join("schedule.json"))
        .expect("Failed to read schedule");
    let doc: serde_json::Value = serde_json::from_str(&content).expect("Schedule is valid JSON");
    let days = doc["days"].as_array().expect("days array");
    assert!(days
        .iter()
        .all(|d| d["workouts"].as_array().unwrap().len() == 1));
}
