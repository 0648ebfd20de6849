//! HTTP server for MCP over SSE.
//!
//! Routes:
//! - `GET /health` liveness with organization and timestamp
//! - `GET /` service description and endpoint map
//! - `GET /sse` opens an event stream bound to a new MCP session
//! - `POST /sse` acknowledges client messages

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, Method},
    response::sse::{KeepAlive, KeepAliveStream, Sse},
    routing::get,
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::mcp::server::McpServer;
use crate::mcp::transport::{Message, SseEventStream, SseTransport};
use crate::{SERVER_NAME, VERSION};

/// Path of the MCP event stream.
pub const SSE_PATH: &str = "/sse";

/// Path of the health check.
pub const HEALTH_PATH: &str = "/health";

/// HTTP server state.
#[derive(Clone)]
pub struct HttpState {
    server: Arc<McpServer>,
    organization: Arc<str>,
}

impl HttpState {
    pub fn new(server: Arc<McpServer>, organization: impl Into<String>) -> Self {
        Self {
            server,
            organization: Arc::from(organization.into()),
        }
    }
}

/// Build the application router.
pub fn router(state: HttpState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_headers(AllowHeaders::mirror_request())
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS]);

    Router::new()
        .route(HEALTH_PATH, get(health_check))
        .route("/", get(service_info))
        .route(SSE_PATH, get(sse_connect).post(sse_message))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server and serve until a shutdown signal arrives.
pub async fn start_server(config: &Config, server: Arc<McpServer>) -> Result<()> {
    let state = HttpState::new(server, config.organization.clone());
    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("{} v{} running on port {}", SERVER_NAME, VERSION, config.port);
    info!("Organization: {}", config.organization);
    info!("Health check: http://localhost:{}{}", config.port, HEALTH_PATH);
    info!("MCP endpoint: http://localhost:{}{}", config.port, SSE_PATH);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!("Failed to register SIGTERM handler: {}", err);
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!("Ctrl-C handler failed: {}", err);
        }
    }

    info!("Shutdown signal received");
}

/// Health check endpoint.
async fn health_check(State(state): State<HttpState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": VERSION,
        "organization": &*state.organization,
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

/// Service description endpoint.
async fn service_info(State(state): State<HttpState>) -> Json<Value> {
    Json(json!({
        "name": SERVER_NAME,
        "version": VERSION,
        "organization": &*state.organization,
        "description": "MCP server for interacting with Azure DevOps",
        "endpoints": {
            "health": HEALTH_PATH,
            "mcp": SSE_PATH,
        },
    }))
}

/// Open an SSE stream and connect a new MCP session to it.
async fn sse_connect(
    State(state): State<HttpState>,
) -> Result<Sse<KeepAliveStream<SseEventStream>>> {
    let (transport, stream) = SseTransport::new(SSE_PATH);
    info!("New SSE connection: {}", transport.message_endpoint());

    state.server.connect(transport).await?;

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// Acknowledge a client message.
///
/// Messages are logged but not delivered to any session. Only a body that
/// declares a JSON content type is parsed; anything else is acknowledged as is.
async fn sse_message(
    Query(query): Query<MessageQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    if !declares_json(&headers) || body.is_empty() {
        debug!(
            "Received {} byte unparsed body for session {:?}",
            body.len(),
            query.session_id
        );
        return Ok(Json(json!({ "status": "Message received" })));
    }

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| Error::InvalidRequest(format!("Malformed JSON body: {}", e)))?;
    if !payload.is_object() && !payload.is_array() {
        return Err(Error::InvalidRequest(
            "JSON body must be an object or an array".to_string(),
        ));
    }

    match Message::from_value(payload) {
        Ok(msg) => debug!(
            "Received {} for session {:?}",
            msg.method().unwrap_or("response"),
            query.session_id
        ),
        Err(_) => debug!(
            "Received non JSON-RPC payload for session {:?}",
            query.session_id
        ),
    }

    Ok(Json(json!({ "status": "Message received" })))
}

/// `application/json` or any `+json` media type, parameters ignored.
fn declares_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}
