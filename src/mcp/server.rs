//! MCP server implementation.
//!
//! `McpServer` owns the capability set built at startup. Every client
//! connection gets its own `McpSession` that shares those capabilities but
//! keeps its own protocol state. Requests on a session run concurrently, so
//! a `notifications/cancelled` can abort one that is still in flight.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::{AbortHandle, JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::mcp::handler::{error_result, McpHandler};
use crate::mcp::prompts::{ListPromptsResult, PromptRegistry};
use crate::mcp::protocol::*;
use crate::mcp::transport::{Message, Transport};
use crate::VERSION;

/// MCP server.
pub struct McpServer {
    handler: Arc<McpHandler>,
    prompts: Arc<PromptRegistry>,
    info: ServerInfo,
}

impl McpServer {
    /// Create a new MCP server.
    pub fn new(handler: McpHandler, prompts: PromptRegistry, name: impl Into<String>) -> Self {
        Self {
            handler: Arc::new(handler),
            prompts: Arc::new(prompts),
            info: ServerInfo {
                name: name.into(),
                version: VERSION.to_string(),
            },
        }
    }

    /// Number of registered tools.
    pub fn tool_count(&self) -> usize {
        self.handler.tool_count()
    }

    /// Number of registered prompts.
    pub fn prompt_count(&self) -> usize {
        self.prompts.prompt_count()
    }

    /// Create a session that shares this server's capabilities.
    pub fn session(&self, id: impl Into<String>) -> McpSession {
        McpSession {
            id: id.into(),
            handler: Arc::clone(&self.handler),
            prompts: Arc::clone(&self.prompts),
            info: self.info.clone(),
            initialized: AtomicBool::new(false),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Start `transport` and serve it on a background task.
    ///
    /// Fails if the transport cannot be started; afterwards the session runs
    /// until the client goes away.
    pub async fn connect<T>(&self, mut transport: T) -> Result<JoinHandle<()>>
    where
        T: Transport + 'static,
    {
        let session = Arc::new(self.session(transport.session_id()));
        let (incoming, outgoing) = transport.start().await?;
        info!("MCP session {} connected", session.id());

        Ok(tokio::spawn(async move {
            Arc::clone(&session).serve(incoming, outgoing).await;
            if let Err(e) = transport.stop().await {
                warn!("Error stopping transport for {}: {}", session.id(), e);
            }
            info!("MCP session {} closed", session.id());
        }))
    }
}

/// Protocol state for one connected client.
pub struct McpSession {
    id: String,
    handler: Arc<McpHandler>,
    prompts: Arc<PromptRegistry>,
    info: ServerInfo,
    initialized: AtomicBool,
    in_flight: Mutex<HashMap<RequestId, AbortHandle>>,
}

impl McpSession {
    /// Session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the client has sent `notifications/initialized`.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Process messages until the inbound channel ends or the client disconnects.
    ///
    /// Each request is handled on its own task. When the inbound channel ends,
    /// requests already accepted still get their responses; when the client
    /// disconnects they are aborted.
    pub async fn serve(
        self: Arc<Self>,
        mut incoming: mpsc::Receiver<Message>,
        outgoing: mpsc::Sender<Message>,
    ) {
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                msg = incoming.recv() => match msg {
                    Some(Message::Request(req)) => self.dispatch(&mut tasks, req, &outgoing).await,
                    Some(Message::Notification(notif)) => self.handle_notification(notif).await,
                    Some(Message::Response(_)) => warn!("Received unexpected response"),
                    None => {
                        tokio::select! {
                            _ = async { while tasks.join_next().await.is_some() {} } => {}
                            _ = outgoing.closed() => tasks.abort_all(),
                        }
                        break;
                    }
                },
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
                _ = outgoing.closed() => {
                    debug!("Client for session {} disconnected", self.id);
                    tasks.abort_all();
                    break;
                }
            }
        }

        self.in_flight.lock().await.clear();
    }

    async fn dispatch(
        self: &Arc<Self>,
        tasks: &mut JoinSet<()>,
        req: JsonRpcRequest,
        outgoing: &mpsc::Sender<Message>,
    ) {
        let id = req.id.clone();
        let session = Arc::clone(self);
        let outgoing = outgoing.clone();

        // Registered under the lock so the task cannot finish before it is tracked.
        let mut in_flight = self.in_flight.lock().await;
        let handle = tasks.spawn(async move {
            let response = session.handle_request(req).await;
            session.in_flight.lock().await.remove(&response.id);
            if outgoing.send(Message::Response(response)).await.is_err() {
                debug!("Dropped response on closed session {}", session.id);
            }
        });
        if let Some(previous) = in_flight.insert(id.clone(), handle) {
            warn!("Request id {} reused while still in flight", id);
            previous.abort();
        }
    }

    /// Handle a JSON-RPC request.
    pub async fn handle_request(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        debug!("Handling request: {} (id: {})", req.method, req.id);
        if !self.is_initialized() && !matches!(req.method.as_str(), "initialize" | "ping") {
            debug!("{} received before initialization on {}", req.method, self.id);
        }

        let result = match req.method.as_str() {
            "initialize" => self.handle_initialize(),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(req.params).await,
            "prompts/list" => self.handle_list_prompts(),
            "prompts/get" => self.handle_get_prompt(req.params),
            _ => Err(Error::MethodNotFound(req.method.clone())),
        };

        match result {
            Ok(value) => JsonRpcResponse::success(req.id, value),
            Err(e) => JsonRpcResponse::failure(req.id, JsonRpcError::from(&e)),
        }
    }

    /// Handle a notification.
    pub async fn handle_notification(&self, notif: JsonRpcNotification) {
        debug!("Handling notification: {}", notif.method);

        match notif.method.as_str() {
            "notifications/initialized" => {
                self.initialized.store(true, Ordering::SeqCst);
                info!("Client initialized on session {}", self.id);
            }
            "notifications/cancelled" => {
                let Some(cancel) = notif
                    .params
                    .and_then(|p| serde_json::from_value::<CancelledParams>(p).ok())
                else {
                    warn!("Ignoring malformed cancellation on session {}", self.id);
                    return;
                };

                match self.in_flight.lock().await.remove(&cancel.request_id) {
                    Some(handle) => {
                        handle.abort();
                        info!(
                            "Cancelled request {} ({})",
                            cancel.request_id,
                            cancel.reason.as_deref().unwrap_or("no reason given")
                        );
                    }
                    None => debug!("Request {} is not in flight", cancel.request_id),
                }
            }
            _ => {
                debug!("Unknown notification: {}", notif.method);
            }
        }
    }

    fn handle_initialize(&self) -> Result<Value> {
        let result = InitializeResult::new(self.info.clone());
        Ok(serde_json::to_value(result)?)
    }

    fn handle_list_tools(&self) -> Result<Value> {
        let result = ListToolsResult {
            tools: self.handler.list_tools(),
        };
        Ok(serde_json::to_value(result)?)
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value> {
        let params: CallToolParams = parse_params(params)?;

        let handler = self
            .handler
            .get_tool(&params.name)
            .ok_or_else(|| Error::ToolNotFound(params.name.clone()))?;

        let result = match handler.execute(params.arguments).await {
            Ok(result) => result,
            Err(e @ Error::InvalidArguments(_)) => return Err(e),
            Err(e) => {
                warn!("Tool {} failed: {}", params.name, e);
                error_result(e.to_string())
            }
        };
        Ok(serde_json::to_value(result)?)
    }

    fn handle_list_prompts(&self) -> Result<Value> {
        let result = ListPromptsResult {
            prompts: self.prompts.list(),
            next_cursor: None,
        };
        Ok(serde_json::to_value(result)?)
    }

    fn handle_get_prompt(&self, params: Option<Value>) -> Result<Value> {
        #[derive(serde::Deserialize)]
        struct GetPromptParams {
            name: String,
            #[serde(default)]
            arguments: HashMap<String, String>,
        }

        let params: GetPromptParams = parse_params(params)?;
        let result = self.prompts.get(&params.name, &params.arguments)?;
        Ok(serde_json::to_value(result)?)
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Option<Value>) -> Result<T> {
    params
        .ok_or_else(|| Error::InvalidArguments("Missing params".to_string()))
        .and_then(|v| serde_json::from_value(v).map_err(|e| Error::InvalidArguments(e.to_string())))
}
