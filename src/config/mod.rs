//! Configuration management for the relay.

use clap::Parser;

use crate::error::{Error, Result};

/// Base URL of Azure DevOps Services.
pub const AZURE_DEVOPS_BASE_URL: &str = "https://dev.azure.com";

/// Default HTTP listen port.
pub const DEFAULT_PORT: u16 = 3000;

/// Environment variable carrying the organization name.
pub const ORGANIZATION_ENV: &str = "AZURE_ORGANIZATION_NAME";

/// Command-line arguments for the relay.
#[derive(Parser, Debug, Clone)]
#[command(name = "ado-mcp-relay")]
#[command(author = "Azure DevOps MCP Relay Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP server for interacting with Azure DevOps over HTTP/SSE")]
pub struct Args {
    /// Azure DevOps organization name
    #[arg(short, long, env = ORGANIZATION_ENV)]
    pub organization: Option<String>,

    /// HTTP listen port
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PORT")]
    pub port: u16,

    /// Enable debug logging
    #[arg(short, long, env = "ADO_MCP_DEBUG")]
    pub debug: bool,
}

/// Validated server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Azure DevOps organization name
    pub organization: String,
    /// HTTP port
    pub port: u16,
    /// Debug mode
    pub debug: bool,
}

impl Config {
    /// URL of the organization, e.g. `https://dev.azure.com/contoso`.
    pub fn org_url(&self) -> String {
        format!("{}/{}", AZURE_DEVOPS_BASE_URL, self.organization)
    }
}

impl TryFrom<Args> for Config {
    type Error = Error;

    fn try_from(args: Args) -> Result<Self> {
        let organization = args
            .organization
            .map(|org| org.trim().to_string())
            .filter(|org| !org.is_empty())
            .ok_or_else(|| {
                Error::Config(format!("{} environment variable is required", ORGANIZATION_ENV))
            })?;

        Ok(Self {
            organization,
            port: args.port,
            debug: args.debug,
        })
    }
}
