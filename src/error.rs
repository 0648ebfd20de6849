//! Error types for the Azure DevOps MCP relay.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the relay.
#[derive(Error, Debug)]
pub enum Error {
    // ===== Azure DevOps Errors =====
    #[error("API error: {status} {status_text} - {message}")]
    Api {
        status: u16,
        status_text: String,
        message: String,
    },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Credential unavailable: {0}")]
    CredentialUnavailable(String),

    // ===== MCP Errors =====
    #[error("MCP protocol error: {0}")]
    McpProtocol(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Prompt not found: {0}")]
    PromptNotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Transport error: {0}")]
    Transport(String),

    // ===== I/O Errors =====
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // ===== HTTP Errors =====
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // ===== Internal Errors =====
    #[error("Internal error: {0}")]
    Internal(String),

    /// Startup configuration problem, displayed as the bare message.
    #[error("{0}")]
    Config(String),

    #[error("Timeout: operation timed out after {seconds} seconds")]
    Timeout { seconds: u64 },
}

impl Error {
    /// Create an API error from HTTP response details.
    pub fn api(status: u16, status_text: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            status_text: status_text.into(),
            message: message.into(),
        }
    }

    /// Stable identifier for the error, used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Api { .. } => "api",
            Self::Auth(_) => "auth",
            Self::CredentialUnavailable(_) => "credential_unavailable",
            Self::McpProtocol(_) => "mcp_protocol",
            Self::MethodNotFound(_) => "method_not_found",
            Self::ToolNotFound(_) => "tool_not_found",
            Self::PromptNotFound(_) => "prompt_not_found",
            Self::InvalidArguments(_) => "invalid_arguments",
            Self::Transport(_) => "transport",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Http(_) => "http",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Internal(_) => "internal",
            Self::Config(_) => "config",
            Self::Timeout { .. } => "timeout",
        }
    }

    /// HTTP status used when the error escapes a request handler.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidArguments(_) => StatusCode::BAD_REQUEST,
            Self::Auth(_) | Self::CredentialUnavailable(_) => StatusCode::UNAUTHORIZED,
            Self::MethodNotFound(_) | Self::ToolNotFound(_) | Self::PromptNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Api { .. } | Self::Http(_) => StatusCode::BAD_GATEWAY,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
