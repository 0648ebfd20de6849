//! Azure DevOps MCP Relay
//!
//! Serves MCP over HTTP/SSE for a single Azure DevOps organization.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ado_mcp_relay::auth::DeveloperCredential;
use ado_mcp_relay::config::{Args, Config};
use ado_mcp_relay::devops::DevOpsClientFactory;
use ado_mcp_relay::error::Result;
use ado_mcp_relay::mcp::handler::McpHandler;
use ado_mcp_relay::mcp::prompts::{configure_prompts, PromptRegistry};
use ado_mcp_relay::mcp::server::McpServer;
use ado_mcp_relay::{http, tools, SERVER_NAME, VERSION};

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = match Config::try_from(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(config.debug);

    // Pins AZURE_TOKEN_CREDENTIALS while the process is still single threaded.
    let credential = Arc::new(DeveloperCredential::new());

    match run(config, credential) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Fatal error in main(): {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    if let Err(e) = result {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

#[tokio::main]
async fn run(config: Config, credential: Arc<DeveloperCredential>) -> Result<()> {
    info!("Starting {} v{}", SERVER_NAME, VERSION);

    let factory = Arc::new(DevOpsClientFactory::new(config.org_url(), credential));

    let mut handler = McpHandler::new();
    tools::register_all_tools(&mut handler, factory);

    let mut prompts = PromptRegistry::new();
    configure_prompts(&mut prompts);

    let server = McpServer::new(handler, prompts, SERVER_NAME);
    info!(
        "Registered {} MCP tools and {} prompts",
        server.tool_count(),
        server.prompt_count()
    );

    http::start_server(&config, Arc::new(server)).await
}
