//! Credentials backed by the Azure command-line tools.

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::io::ErrorKind;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::auth::{AccessToken, TokenProvider};
use crate::error::{Error, Result};

/// Upper bound for a single CLI token request.
const CLI_TIMEOUT: Duration = Duration::from_secs(30);

/// Output of `az account get-access-token --output json`.
#[derive(Debug, Deserialize)]
struct AzCliToken {
    #[serde(rename = "accessToken")]
    access_token: String,
    /// Unix timestamp, present on az 2.54 and later.
    #[serde(default)]
    expires_on: Option<i64>,
    /// Local time, e.g. `2024-01-01 12:00:00.000000`.
    #[serde(rename = "expiresOn", default)]
    expires_on_local: Option<String>,
}

/// Output of `azd auth token --output json`.
#[derive(Debug, Deserialize)]
struct AzdToken {
    token: String,
    #[serde(rename = "expiresOn")]
    expires_on: String,
}

/// Parse the JSON printed by the Azure CLI.
pub fn parse_az_cli_token(stdout: &str) -> Result<AccessToken> {
    let parsed: AzCliToken = serde_json::from_str(stdout)
        .map_err(|e| Error::Auth(format!("Unexpected Azure CLI output: {}", e)))?;

    let expires_on = match (parsed.expires_on, parsed.expires_on_local.as_deref()) {
        (Some(ts), _) => Utc
            .timestamp_opt(ts, 0)
            .single()
            .ok_or_else(|| Error::Auth(format!("Invalid expires_on timestamp: {}", ts)))?,
        (None, Some(local)) => parse_local_time(local)?,
        (None, None) => {
            return Err(Error::Auth(
                "Azure CLI output has no token expiry".to_string(),
            ))
        }
    };

    Ok(AccessToken::new(parsed.access_token, expires_on))
}

/// Parse the JSON printed by the Azure Developer CLI.
pub fn parse_azd_token(stdout: &str) -> Result<AccessToken> {
    let parsed: AzdToken = serde_json::from_str(stdout)
        .map_err(|e| Error::Auth(format!("Unexpected Azure Developer CLI output: {}", e)))?;

    let expires_on = DateTime::parse_from_rfc3339(&parsed.expires_on)
        .map_err(|e| Error::Auth(format!("Invalid expiresOn '{}': {}", parsed.expires_on, e)))?
        .with_timezone(&Utc);

    Ok(AccessToken::new(parsed.token, expires_on))
}

fn parse_local_time(value: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .map_err(|e| Error::Auth(format!("Invalid expiresOn '{}': {}", value, e)))?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| Error::Auth(format!("Ambiguous local time: {}", value)))
}

/// Build a command for a CLI tool; Windows installs ship `.cmd` shims.
fn cli_command(program: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(program);
        cmd
    } else {
        Command::new(program)
    }
}

/// Run a CLI command and return stdout, mapping failures to credential errors.
async fn run_cli(tool: &str, mut command: Command) -> Result<String> {
    command.kill_on_drop(true);

    let output: Output = match tokio::time::timeout(CLI_TIMEOUT, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
            return Err(Error::CredentialUnavailable(format!(
                "{} is not installed",
                tool
            )));
        }
        Ok(Err(e)) => return Err(Error::Io(e)),
        Err(_) => {
            return Err(Error::Timeout {
                seconds: CLI_TIMEOUT.as_secs(),
            })
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(Error::CredentialUnavailable(format!(
            "{} failed ({}): {}",
            tool, output.status, stderr
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Credential that asks the Azure CLI for a token.
#[derive(Debug, Clone, Default)]
pub struct AzureCliCredential;

impl AzureCliCredential {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TokenProvider for AzureCliCredential {
    fn name(&self) -> &str {
        "AzureCliCredential"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        debug!("Requesting token from Azure CLI for scope {}", scope);

        let mut command = cli_command("az");
        command.args(["account", "get-access-token", "--scope", scope, "--output", "json"]);

        let stdout = run_cli("Azure CLI", command).await?;
        parse_az_cli_token(&stdout)
    }
}

/// Credential that asks the Azure Developer CLI for a token.
#[derive(Debug, Clone, Default)]
pub struct AzureDeveloperCliCredential;

impl AzureDeveloperCliCredential {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TokenProvider for AzureDeveloperCliCredential {
    fn name(&self) -> &str {
        "AzureDeveloperCliCredential"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        debug!("Requesting token from Azure Developer CLI for scope {}", scope);

        let mut command = cli_command("azd");
        command.args(["auth", "token", "--scope", scope, "--output", "json"]);

        let stdout = run_cli("Azure Developer CLI", command).await?;
        parse_azd_token(&stdout)
    }
}
