//! HTTP Server Integration Tests
//!
//! These tests spawn the relay binary and talk to it over HTTP.

#![allow(deprecated)] // Allow deprecated cargo_bin for now

use assert_cmd::cargo::CommandCargoExt;
use assert_cmd::Command as AssertCommand;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

const BINARY: &str = "ado-mcp-relay";

/// Relay process that is killed when dropped.
struct RelayProcess {
    child: Child,
    base_url: String,
}

impl RelayProcess {
    /// Spawn the relay on a free port and wait until it answers health checks.
    async fn spawn(organization: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let port = free_port()?;
        Self::spawn_on(organization, port, port, &[]).await
    }

    /// Spawn with `PORT=env_port` and extra arguments, expecting it on `listen_port`.
    async fn spawn_on(
        organization: &str,
        env_port: u16,
        listen_port: u16,
        args: &[String],
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let child = Command::cargo_bin(BINARY)?
            .args(args)
            .current_dir(std::env::temp_dir())
            .env("AZURE_ORGANIZATION_NAME", organization)
            .env("PORT", env_port.to_string())
            .env_remove("RUST_LOG")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let relay = Self {
            child,
            base_url: format!("http://127.0.0.1:{}", listen_port),
        };
        relay.wait_ready().await?;
        Ok(relay)
    }

    async fn wait_ready(&self) -> Result<(), Box<dyn std::error::Error>> {
        let deadline = Instant::now() + Duration::from_secs(15);
        let url = format!("{}/health", self.base_url);
        loop {
            if reqwest::get(&url).await.is_ok() {
                return Ok(());
            }
            if Instant::now() > deadline {
                return Err("relay did not become ready".into());
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for RelayProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn free_port() -> std::io::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

// ===== Process Bootstrap Tests =====

#[test]
fn test_missing_organization_exits_with_error() {
    AssertCommand::cargo_bin(BINARY)
        .unwrap()
        .current_dir(std::env::temp_dir())
        .env_remove("AZURE_ORGANIZATION_NAME")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "Error: AZURE_ORGANIZATION_NAME environment variable is required",
        ));
}

#[test]
fn test_blank_organization_exits_with_error() {
    AssertCommand::cargo_bin(BINARY)
        .unwrap()
        .current_dir(std::env::temp_dir())
        .env("AZURE_ORGANIZATION_NAME", "   ")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_help() {
    AssertCommand::cargo_bin(BINARY)
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--organization"))
        .stdout(predicate::str::contains("--port"));
}

#[test]
fn test_version() {
    AssertCommand::cargo_bin(BINARY)
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[tokio::test]
async fn test_port_env_selects_listener() {
    let port = free_port().unwrap();
    let relay = RelayProcess::spawn_on("contoso", port, port, &[])
        .await
        .unwrap();

    let response = reqwest::get(format!("http://127.0.0.1:{}/health", port))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    drop(relay);
}

#[tokio::test]
async fn test_port_flag_overrides_env() {
    let env_port = free_port().unwrap();
    let flag_port = free_port().unwrap();
    let relay = RelayProcess::spawn_on(
        "contoso",
        env_port,
        flag_port,
        &["--port".to_string(), flag_port.to_string()],
    )
    .await
    .unwrap();

    let response = reqwest::get(relay.url("/health")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert!(reqwest::get(format!("http://127.0.0.1:{}/health", env_port))
        .await
        .is_err());
}

// ===== HTTP Surface Tests =====

#[tokio::test]
async fn test_health_reports_organization() {
    let relay = RelayProcess::spawn("contoso").await.unwrap();

    let response = reqwest::get(relay.url("/health")).await.unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["organization"], "contoso");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_root_lists_endpoints() {
    let relay = RelayProcess::spawn("contoso").await.unwrap();

    let body: Value = reqwest::get(relay.url("/"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["name"], "Azure DevOps MCP Server");
    assert_eq!(body["endpoints"], json!({ "health": "/health", "mcp": "/sse" }));
}

#[tokio::test]
async fn test_sse_stream_opens() {
    let relay = RelayProcess::spawn("contoso").await.unwrap();

    let mut response = reqwest::get(relay.url("/sse")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );

    let chunk = tokio::time::timeout(Duration::from_secs(5), response.chunk())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let text = String::from_utf8_lossy(&chunk);
    assert!(text.contains("event: endpoint"));
    assert!(text.contains("/sse?sessionId="));
}

#[tokio::test]
async fn test_post_message_acknowledged() {
    let relay = RelayProcess::spawn("contoso").await.unwrap();
    let client = reqwest::Client::new();

    let response = client
        .post(relay.url("/sse"))
        .json(&json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "status": "Message received" }));
}

#[tokio::test]
async fn test_post_invalid_body_rejected() {
    let relay = RelayProcess::spawn("contoso").await.unwrap();
    let client = reqwest::Client::new();

    let response = client
        .post(relay.url("/sse"))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn test_post_untyped_body_acknowledged() {
    let relay = RelayProcess::spawn("contoso").await.unwrap();
    let client = reqwest::Client::new();

    let response = client
        .post(relay.url("/sse"))
        .body(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "status": "Message received" }));
}
