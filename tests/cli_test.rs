// tests/cli_test.rs
mod helpers;

use helpers::{can_bind_loopback, free_port, sample_record, spawn_mock_influx};
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_build2influx"))
}

fn write_record(dir: &TempDir, record: &serde_json::Value) -> PathBuf {
    let path = dir.path().join("build.json");
    fs::write(&path, serde_json::to_vec(record).unwrap()).unwrap();
    path
}

#[test]
fn test_init_creates_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join(".build2influx.toml");

    let output = Command::new(binary())
        .args(["init", "--url", "http://influx:8086", "--database", "ci"])
        .current_dir(temp_dir.path())
        .output()
        .expect("Failed to run command");

    assert!(
        output.status.success(),
        "Command failed: {:?}",
        String::from_utf8_lossy(&output.stderr)
    );
    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("url = \"http://influx:8086\""));
    assert!(content.contains("database = \"ci\""));
}

#[test]
fn test_init_refuses_overwrite_without_force() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join(".build2influx.toml");
    fs::write(&config_path, "existing").unwrap();

    let output = Command::new(binary())
        .args(["init"])
        .current_dir(temp_dir.path())
        .output()
        .expect("Failed to run command");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("already exists"));
    assert_eq!(fs::read_to_string(&config_path).unwrap(), "existing");

    let output = Command::new(binary())
        .args(["init", "--force"])
        .current_dir(temp_dir.path())
        .output()
        .expect("Failed to run command");
    assert!(output.status.success());
    assert!(fs::read_to_string(&config_path)
        .unwrap()
        .contains("database = \"jenkins\""));
}

#[test]
fn test_emit_dry_run_prints_line_protocol() {
    let temp_dir = TempDir::new().unwrap();
    let record = write_record(&temp_dir, &sample_record());

    let output = Command::new(binary())
        .args(["emit", "--dry-run", "--file"])
        .arg(&record)
        .current_dir(temp_dir.path())
        .env("RUST_LOG", "error")
        .output()
        .expect("Failed to run command");

    assert!(
        output.status.success(),
        "Command failed: {:?}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("jenkins_build_data,"));
    assert!(lines[0].contains("build_url=\"http://ci/job/foo/42\""));
    assert!(lines[0].contains("job_branch=\"main\""));
}

#[test]
fn test_emit_dry_run_keeps_warnings_off_stdout() {
    let temp_dir = TempDir::new().unwrap();
    let mut record = sample_record();
    record["parameters"][0]["parameters"]
        .as_array_mut()
        .unwrap()
        .push(serde_json::json!({ "name": "nothing", "value": null }));
    let record = write_record(&temp_dir, &record);

    let output = Command::new(binary())
        .args(["emit", "--dry-run", "--file"])
        .arg(&record)
        .current_dir(temp_dir.path())
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run command");

    assert!(
        output.status.success(),
        "Command failed: {:?}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 1, "stdout was: {}", stdout);
    assert!(lines[0].starts_with("jenkins_build_data,"));
    assert!(!lines[0].contains("job_nothing"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("malformed parameter"));
}

#[test]
fn test_emit_fails_on_missing_dependency() {
    let temp_dir = TempDir::new().unwrap();
    let mut record = sample_record();
    record.as_object_mut().unwrap().remove("health_score");
    let record = write_record(&temp_dir, &record);

    let output = Command::new(binary())
        .args(["emit", "--dry-run", "--file"])
        .arg(&record)
        .current_dir(temp_dir.path())
        .output()
        .expect("Failed to run command");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("health_score"));
}

#[test]
fn test_emit_without_config_needs_url() {
    let temp_dir = TempDir::new().unwrap();
    let record = write_record(&temp_dir, &sample_record());

    let output = Command::new(binary())
        .args(["emit", "--file"])
        .arg(&record)
        .current_dir(temp_dir.path())
        .env_remove("BUILD2INFLUX_URL")
        .env_remove("BUILD2INFLUX_DATABASE")
        .output()
        .expect("Failed to run command");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("build2influx init"));
}

#[tokio::test]
async fn test_emit_writes_to_influx() {
    if !can_bind_loopback().await {
        eprintln!("skipping emit test: cannot bind to loopback in this environment");
        return;
    }

    let (influx, influx_url) = spawn_mock_influx(free_port().await).await;
    let temp_dir = TempDir::new().unwrap();
    let record = write_record(&temp_dir, &sample_record());

    let output = tokio::process::Command::new(binary())
        .args(["emit", "--database", "builds", "--url", &influx_url, "--file"])
        .arg(&record)
        .current_dir(temp_dir.path())
        .env_remove("BUILD2INFLUX_TOKEN")
        .output()
        .await
        .expect("Failed to run command");

    assert!(
        output.status.success(),
        "Command failed: {:?}",
        String::from_utf8_lossy(&output.stderr)
    );
    let writes = influx.writes().await;
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].query, "db=builds&precision=ms");
    assert!(writes[0].body.starts_with("jenkins_build_data,"));

    influx.stop().await;
}
