//! Integration tests for the `vaulthalla` CLI binary.
//!
//! These tests exercise the CLI as a subprocess, verifying exit codes and
//! output. None of them need a running backend: commands that would talk to
//! one point at a closed local port and assert on the failure path.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;
use std::process::Command;

use futures_util::StreamExt;
use tokio::net::TcpListener;

/// Nothing listens here.
const DEAD_URL: &str = "ws://127.0.0.1:19999";

/// Helper: locate the `vaulthalla` binary built by `cargo test`.
fn vaulthalla_bin() -> String {
    let path = env!("CARGO_BIN_EXE_vaulthalla");
    assert!(
        Path::new(path).exists(),
        "vaulthalla binary not found at {path}"
    );
    path.to_owned()
}

/// Helper: a backend that completes the WebSocket handshake, then reads
/// every frame and answers none.
async fn silent_backend() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
                while ws.next().await.is_some() {}
            });
        }
    });
    format!("ws://{addr}")
}

/// Helper: run vaulthalla with args and return (`exit_code`, stdout, stderr).
fn run(args: &[&str]) -> (i32, String, String) {
    let output = Command::new(vaulthalla_bin())
        .args(args)
        .env("VAULTHALLA_WS_URL", DEAD_URL)
        .env_remove("VAULTHALLA_TOKEN")
        .env_remove("VAULTHALLA_PASSWORD")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to execute vaulthalla");

    let code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (code, stdout, stderr)
}

// ── Version & help ───────────────────────────────────────────────────

#[test]
fn test_version_flag() {
    let (code, stdout, _) = run(&["--version"]);
    assert_eq!(code, 0, "vaulthalla --version should exit 0");
    assert!(
        stdout.contains("vaulthalla"),
        "version output should contain 'vaulthalla': {stdout}"
    );
}

#[test]
fn test_help_flag() {
    let (code, stdout, _) = run(&["--help"]);
    assert_eq!(code, 0, "vaulthalla --help should exit 0");
    assert!(stdout.contains("Vaulthalla CLI"), "help should mention Vaulthalla CLI");
    for sub in ["commands", "send", "login"] {
        assert!(stdout.contains(sub), "help should list '{sub}': {stdout}");
    }
    assert!(stdout.contains("VAULTHALLA_TOKEN"), "help should document env vars");
}

#[test]
fn test_missing_subcommand_fails() {
    let (code, _, stderr) = run(&[]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Usage"), "should print usage: {stderr}");
}

// ── Catalog listing ──────────────────────────────────────────────────

#[test]
fn test_commands_lists_catalog() {
    let (code, stdout, _) = run(&["commands"]);
    assert_eq!(code, 0);
    for name in [
        "auth.login",
        "auth.refresh",
        "storage.vault.list",
        "storage.volume.get",
        "roles.list",
        "group.member.add",
        "settings.update",
    ] {
        assert!(stdout.contains(name), "catalog should list '{name}': {stdout}");
    }
}

// ── Offline validation ───────────────────────────────────────────────

#[test]
fn test_send_unknown_command_rejected_before_connecting() {
    let (code, stdout, stderr) = run(&["--connect-timeout-ms", "60000", "send", "vault.explode"]);
    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert!(
        stderr.contains("unknown command 'vault.explode'"),
        "stderr: {stderr}"
    );
    assert!(!stderr.contains("timed out"), "must not try to connect: {stderr}");
}

#[test]
fn test_send_invalid_payload_rejected() {
    let (code, _, stderr) = run(&["send", "auth.login", "{not json"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("payload is not valid JSON"), "stderr: {stderr}");
}

#[test]
fn test_send_protected_command_without_token_rejected() {
    let (code, _, stderr) = run(&["send", "storage.vault.list"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("requires a token"), "stderr: {stderr}");
}

// ── Connection failures ──────────────────────────────────────────────

#[test]
fn test_send_to_unreachable_backend_times_out() {
    let (code, _, stderr) = run(&[
        "--token",
        "tok",
        "--connect-timeout-ms",
        "300",
        "send",
        "storage.vault.list",
    ]);
    assert_eq!(code, 1);
    assert!(
        stderr.contains("waiting for connection to ws://127.0.0.1:19999"),
        "stderr: {stderr}"
    );
}

#[test]
fn test_url_flag_overrides_env() {
    let (code, _, stderr) = run(&[
        "--url",
        "ws://127.0.0.1:19998",
        "--connect-timeout-ms",
        "300",
        "send",
        "auth.isAuthenticated",
    ]);
    assert_eq!(code, 1);
    assert!(stderr.contains("ws://127.0.0.1:19998"), "stderr: {stderr}");
}

#[test]
fn test_login_to_unreachable_backend_fails() {
    let (code, stdout, stderr) = run(&[
        "--connect-timeout-ms",
        "300",
        "login",
        "--email",
        "admin@vh.local",
        "--password",
        "pw",
    ]);
    assert_eq!(code, 1);
    assert!(!stdout.contains("Logged in"));
    assert!(stderr.contains("timed out"), "stderr: {stderr}");
}

// ── Command failures ─────────────────────────────────────────────────

#[tokio::test]
async fn test_unanswered_command_suggests_retry() {
    let url = silent_backend().await;
    let (code, stdout, stderr) = tokio::task::spawn_blocking(move || {
        run(&[
            "--url",
            url.as_str(),
            "--token",
            "tok",
            "--timeout-ms",
            "200",
            "send",
            "roles.list",
        ])
    })
    .await
    .unwrap();

    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("'roles.list' failed"), "stderr: {stderr}");
    assert!(stderr.contains("Request timed out"), "stderr: {stderr}");
    assert!(stderr.contains("retrying may succeed"), "stderr: {stderr}");
}
