//! Model Context Protocol (MCP) implementation.
//!
//! # Architecture
//!
//! - `protocol` - Core MCP types and message definitions
//! - `server` - Shared server capabilities and per-connection sessions
//! - `transport` - Transport layer (HTTP/SSE)
//! - `handler` - Tool registry
//! - `prompts` - Prompt templates

pub mod handler;
pub mod prompts;
pub mod protocol;
pub mod server;
pub mod transport;

pub use handler::{McpHandler, ToolHandler};
pub use prompts::{configure_prompts, PromptRegistry};
pub use protocol::*;
pub use server::{McpServer, McpSession};
pub use transport::{Message, SseEventStream, SseTransport, Transport};
