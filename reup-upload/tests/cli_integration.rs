//! Integration tests for the reup-upload CLI
//!
//! The remote platform is replaced by a wiremock server configured through a
//! temporary config file.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Write a config pointing both Graph endpoints at `base` and return its path
fn write_config(temp_dir: &TempDir, base: &str) -> PathBuf {
    let config_path = temp_dir.path().join("config.toml");
    let content = format!(
        r#"
[graph]
api_base = "{base}"
video_api_base = "{base}"
timeout_secs = 10

[upload]
staging_dir = "{staging}"

[tokens]
dir = "{tokens}"
"#,
        base = base,
        staging = temp_dir.path().join("uploads").display().to_string().replace('\\', "/"),
        tokens = temp_dir.path().join("tokens").display().to_string().replace('\\', "/"),
    );
    fs::write(&config_path, content).unwrap();
    config_path
}

fn video(temp_dir: &TempDir, name: &str) -> PathBuf {
    let path = temp_dir.path().join(name);
    fs::write(&path, b"fake mp4 payload").unwrap();
    path
}

fn reup_upload(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("reup-upload").unwrap();
    cmd.env("REUPCAST_CONFIG", config).env_remove("RUST_LOG");
    cmd
}

fn staged_count(temp_dir: &TempDir) -> usize {
    fs::read_dir(temp_dir.path().join("uploads"))
        .map(|entries| entries.count())
        .unwrap_or(0)
}

#[test]
fn test_help_lists_exit_codes() {
    Command::cargo_bin("reup-upload")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("EXIT CODES"))
        .stdout(predicate::str::contains("--policy"));
}

#[test]
fn test_no_files_is_invalid_input() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, "http://127.0.0.1:9");

    reup_upload(&config)
        .args(["--token", "abc"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No video files provided"));
}

#[test]
fn test_no_tokens_is_invalid_input() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, "http://127.0.0.1:9");
    let file = video(&temp_dir, "clip.mp4");

    reup_upload(&config)
        .arg(&file)
        .args(["-t", "Clip"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No destination tokens provided"));
    assert!(file.exists());
}

#[test]
fn test_title_count_mismatch() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, "http://127.0.0.1:9");
    let a = video(&temp_dir, "a.mp4");
    let b = video(&temp_dir, "b.mp4");

    reup_upload(&config)
        .arg(&a)
        .arg(&b)
        .args(["-t", "Only one", "--token", "abc"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains(
            "Number of titles (1) does not match the number of videos (2)",
        ));
    assert!(a.exists() && b.exists());
    assert_eq!(staged_count(&temp_dir), 0);
}

#[test]
fn test_missing_source_file_aborts_before_publishing() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, "http://127.0.0.1:9");
    let good = video(&temp_dir, "good.mp4");

    reup_upload(&config)
        .arg(&good)
        .arg(temp_dir.path().join("missing.mp4"))
        .args(["-t", "One", "-t", "Two", "--token", "abc"])
        .assert()
        .code(3)
        .stdout(predicate::str::is_empty());
    assert!(good.exists());
    assert_eq!(staged_count(&temp_dir), 0);
}

#[test]
fn test_unknown_policy_is_invalid_input() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, "http://127.0.0.1:9");

    reup_upload(&config)
        .args(["clip.mp4", "-t", "Clip", "--token", "abc", "--policy", "sometimes"])
        .assert()
        .code(3);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_publish_to_two_destinations() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v14.0/me/videos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "987"})))
        .expect(2)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, &server.uri());
    let file = video(&temp_dir, "clip.mp4");

    let output = reup_upload(&config)
        .arg(&file)
        .args(["-t", "Clip", "--token", "PAGE-TOKEN-ONE", "--token", "PAGE-TOKEN-TWO"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 1);

    let record: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(record["video_index"], 1);
    assert_eq!(record["status"], "success");
    assert_eq!(record["results"].as_array().unwrap().len(), 2);
    assert!(!stdout.contains("PAGE-TOKEN-ONE"));

    // The user's file is kept, the staged copy is gone
    assert!(file.exists());
    assert_eq!(staged_count(&temp_dir), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_upload_exits_one() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v14.0/me/videos"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": {"message": "Invalid video file", "type": "OAuthException", "code": 352}
        })))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, &server.uri());
    let file = video(&temp_dir, "clip.mp4");

    reup_upload(&config)
        .arg(&file)
        .args(["-t", "Clip", "--token", "tok", "--format", "text"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("video 1: failed"))
        .stdout(predicate::str::contains("Invalid video file"));
    assert_eq!(staged_count(&temp_dir), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_consume_deletes_given_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v14.0/me/videos"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": "1"})))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, &server.uri());
    let file = video(&temp_dir, "clip.mp4");

    reup_upload(&config)
        .arg(&file)
        .args(["-t", "Clip", "--token", "tok", "--consume"])
        .assert()
        .success();
    assert!(!file.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_permission_check_failure_exits_two() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me/permissions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{"permission": "publish_video", "status": "granted"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v14.0/me/videos"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, &server.uri());
    let file = video(&temp_dir, "clip.mp4");

    reup_upload(&config)
        .arg(&file)
        .args(["-t", "Clip", "--token", "tok", "--check-permissions"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Missing required permissions"));
    assert!(file.exists());
    assert_eq!(staged_count(&temp_dir), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stored_token_is_used() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v14.0/me/videos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "5"})))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, &server.uri());
    let tokens_dir = temp_dir.path().join("tokens");
    fs::create_dir_all(&tokens_dir).unwrap();
    fs::write(
        tokens_dir.join("token1.txt"),
        "Token: stored-page-token\nTimestamp: 2024-05-01T10:00:00.000Z",
    )
    .unwrap();
    let file = video(&temp_dir, "clip.mp4");

    reup_upload(&config)
        .arg(&file)
        .args(["-t", "Clip", "--stored", "token1.txt"])
        .assert()
        .success();
}
