//! Azure DevOps MCP Relay
//!
//! A Model Context Protocol (MCP) server that exposes Azure DevOps to AI
//! assistants over HTTP with Server-Sent Events.
//!
//! # Architecture
//!
//! 1. **Auth Layer** (`auth`) - Developer token chain (Azure CLI, Azure Developer CLI)
//! 2. **DevOps Layer** (`devops`) - REST client and per-call client factory
//! 3. **MCP Layer** (`mcp`) - Protocol, sessions, SSE transport
//! 4. **Tools Layer** (`tools`) - MCP tools backed by the DevOps client
//! 5. **HTTP Layer** (`http`) - Health, service info and SSE endpoints

pub mod auth;
pub mod config;
pub mod devops;
pub mod error;
pub mod http;
pub mod mcp;
pub mod tools;

pub use error::{Error, Result};

/// Server version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server name reported to clients.
pub const SERVER_NAME: &str = "Azure DevOps MCP Server";
