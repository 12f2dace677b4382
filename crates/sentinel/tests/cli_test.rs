//! Integration tests for the `sentinel` CLI binary.
//!
//! Argument parsing, help output, completions and error exit codes run
//! without a backend; incident commands run against a wiremock server.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `sentinel` binary with env isolation.
///
/// Clears all `SENTINEL_*` env vars and points config directories at
/// `home` so tests never touch the user's real configuration.
fn sentinel_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("sentinel");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("SENTINEL_PROFILE")
        .env_remove("SENTINEL_API_URL")
        .env_remove("SENTINEL_OUTPUT")
        .env_remove("SENTINEL_INSECURE")
        .env_remove("SENTINEL_TIMEOUT")
        .env_remove("SENTINEL_USERNAME")
        .env_remove("SENTINEL_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Run a command off the async runtime so the mock server keeps serving.
async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output())
        .await
        .unwrap()
        .unwrap()
}

fn incident(id: i64, severity: &str, kind: &str) -> serde_json::Value {
    json!({
        "id": id,
        "timestamp": "2025-03-01T12:00:00",
        "source": "sensor-1",
        "score": 0.75,
        "is_anomaly": severity == "critical",
        "severity": severity,
        "type": kind,
        "message": format!("incident {id}")
    })
}

async fn backend_with(incidents: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/incidents/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(incidents))
        .mount(&server)
        .await;
    server
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = sentinel_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    sentinel_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("incidents")
                .and(predicate::str::contains("whoami"))
                .and(predicate::str::contains("admin"))
                .and(predicate::str::contains("config")),
        );
}

#[test]
fn test_incidents_subcommands_exist() {
    let home = tempfile::tempdir().unwrap();
    sentinel_cmd(home.path())
        .args(["incidents", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("list")
                .and(predicate::str::contains("summary"))
                .and(predicate::str::contains("watch")),
        );
}

#[test]
fn test_completions_zsh() {
    let home = tempfile::tempdir().unwrap();
    sentinel_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_invalid_severity_is_rejected_by_the_parser() {
    let home = tempfile::tempdir().unwrap();
    let output = sentinel_cmd(home.path())
        .args(["incidents", "list", "--severity", "apocalyptic"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("apocalyptic"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_is_under_config_home() {
    let home = tempfile::tempdir().unwrap();
    sentinel_cmd(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_no_config() {
    let home = tempfile::tempdir().unwrap();
    sentinel_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success();
}

#[test]
fn test_unknown_profile_is_a_usage_error() {
    let home = tempfile::tempdir().unwrap();
    let output = sentinel_cmd(home.path())
        .args(["--profile", "nope", "incidents", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("'nope' not found"));
}

#[test]
fn test_config_use_rejects_unknown_profile() {
    let home = tempfile::tempdir().unwrap();
    sentinel_cmd(home.path())
        .args(["config", "use", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ghost"));
}

// ── Incidents against a mock backend ────────────────────────────────

#[tokio::test]
async fn test_incidents_list_filters_by_severity() {
    let server = backend_with(json!([
        incident(3, "high", "spike"),
        incident(2, "low", "drift"),
        incident(1, "high", "drift"),
    ]))
    .await;
    let home = tempfile::tempdir().unwrap();

    let mut cmd = sentinel_cmd(home.path());
    cmd.args(["--api-url", &format!("{}/v1", server.uri())])
        .args(["-o", "plain", "incidents", "list", "--severity", "high"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "3\n1\n");
}

#[tokio::test]
async fn test_incidents_list_json_keeps_wire_field_names() {
    let server = backend_with(json!([incident(7, "critical", "spike")])).await;
    let home = tempfile::tempdir().unwrap();

    let mut cmd = sentinel_cmd(home.path());
    cmd.args(["--api-url", &format!("{}/v1", server.uri())])
        .args(["-o", "json", "incidents", "list"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body[0]["id"], "7");
    assert_eq!(body[0]["severity"], "critical");
    assert_eq!(body[0]["type"], "spike");
}

#[tokio::test]
async fn test_incidents_summary_counts() {
    let server = backend_with(json!([
        incident(4, "critical", "spike"),
        incident(3, "high", "spike"),
        incident(2, "medium", "drift"),
        incident(1, "low", "drift"),
    ]))
    .await;
    let home = tempfile::tempdir().unwrap();

    let mut cmd = sentinel_cmd(home.path());
    cmd.args(["--api-url", &format!("{}/v1", server.uri())])
        .args(["-o", "json-compact", "incidents", "summary"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["total"], 4);
    assert_eq!(body["urgent"], 2);
    assert_eq!(body["anomalies"], 1);
}

#[tokio::test]
async fn test_server_error_exit_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/incidents/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    let mut cmd = sentinel_cmd(home.path());
    cmd.args(["--api-url", &format!("{}/v1", server.uri())])
        .args(["incidents", "list"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(5));
    assert!(combined_output(&output).contains("HTTP 500"));
}

#[test]
fn test_unreachable_backend_exit_code() {
    let home = tempfile::tempdir().unwrap();
    let output = sentinel_cmd(home.path())
        .args(["--api-url", "http://127.0.0.1:9/v1", "--timeout", "2"])
        .args(["incidents", "list"])
        .output()
        .unwrap();
    assert!(
        matches!(output.status.code(), Some(7 | 8)),
        "{}",
        combined_output(&output)
    );
}

// ── Whoami ──────────────────────────────────────────────────────────

#[test]
fn test_whoami_without_credentials() {
    let home = tempfile::tempdir().unwrap();
    let output = sentinel_cmd(home.path())
        .args(["--api-url", "http://127.0.0.1:9/v1", "whoami"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
}

#[tokio::test]
async fn test_whoami_logs_in_with_env_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "cli-token",
            "token_type": "bearer",
            "user": {"username": "alice", "role": "analyst"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/auth/me"))
        .and(header("authorization", "Bearer cli-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "username": "alice",
            "role": "analyst",
            "email": "alice@example.com"
        })))
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    let mut cmd = sentinel_cmd(home.path());
    cmd.env("SENTINEL_USERNAME", "alice")
        .env("SENTINEL_PASSWORD", "s3cret")
        .args(["--api-url", &format!("{}/v1", server.uri())])
        .args(["-o", "plain", "whoami"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "alice");
}

#[tokio::test]
async fn test_profile_from_config_file() {
    let server = backend_with(json!([incident(9, "medium", "drift")])).await;
    let home = tempfile::tempdir().unwrap();

    let path_out = sentinel_cmd(home.path())
        .args(["config", "path"])
        .output()
        .unwrap();
    let config_path = String::from_utf8_lossy(&path_out.stdout).trim().to_owned();
    let config_path = Path::new(&config_path);
    std::fs::create_dir_all(config_path.parent().unwrap()).unwrap();
    std::fs::write(
        config_path,
        format!(
            "default_profile = \"lab\"\n\n[profiles.lab]\napi_url = \"{}/v1\"\n",
            server.uri()
        ),
    )
    .unwrap();

    let mut cmd = sentinel_cmd(home.path());
    cmd.args(["-o", "plain", "incidents", "list"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "9");
}

// ── Admin ───────────────────────────────────────────────────────────

#[test]
fn test_admin_subcommands_exist() {
    let home = tempfile::tempdir().unwrap();
    sentinel_cmd(home.path())
        .args(["admin", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("stats")
                .and(predicate::str::contains("generator"))
                .and(predicate::str::contains("generate-test"))
                .and(predicate::str::contains("crisis"))
                .and(predicate::str::contains("clear-db")),
        );
}

#[test]
fn test_admin_generate_test_rejects_zero_count() {
    let home = tempfile::tempdir().unwrap();
    let output = sentinel_cmd(home.path())
        .args(["admin", "generate-test", "--count", "0"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[tokio::test]
async fn test_admin_stats() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/admin/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_incidents": 42,
            "today_count": 7,
            "last_incident": {"timestamp": "2025-03-01T12:00:00", "severity": "high"},
            "generator_running": false,
            "generator_count": 0
        })))
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    let mut cmd = sentinel_cmd(home.path());
    cmd.args(["--api-url", &format!("{}/v1", server.uri())])
        .args(["admin", "stats"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Incidents:   42"), "{stdout}");
    assert!(stdout.contains("(high)"), "{stdout}");
    assert!(stdout.contains("stopped"), "{stdout}");
}

#[tokio::test]
async fn test_admin_generator_start_sends_settings() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/admin/generator/start"))
        .and(body_json(json!({"interval": 2, "anomalyRate": 75})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "started",
            "message": "Generator started in background",
            "settings": {"interval": 2, "anomalyRate": 75}
        })))
        .expect(1)
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    let mut cmd = sentinel_cmd(home.path());
    cmd.args(["--api-url", &format!("{}/v1", server.uri()), "-o", "plain"])
        .args(["admin", "generator", "start", "--interval", "2", "--anomaly-rate", "75"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "started");
}

#[tokio::test]
async fn test_admin_clear_db_with_yes() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/admin/clear-database"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "deleted": 12,
            "message": "12 incidents deleted"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    let mut cmd = sentinel_cmd(home.path());
    cmd.args(["--api-url", &format!("{}/v1", server.uri()), "--yes"])
        .args(["admin", "clear-db"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Deleted 12 incidents"));
}

#[tokio::test]
async fn test_admin_clear_db_needs_confirmation() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/admin/clear-database"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": 0})))
        .expect(0)
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    // No terminal to answer the prompt, so nothing may be deleted.
    let mut cmd = sentinel_cmd(home.path());
    cmd.args(["--api-url", &format!("{}/v1", server.uri())])
        .args(["admin", "clear-db"]);
    let output = run(cmd).await;

    assert!(!output.status.success(), "{}", combined_output(&output));
}
