//! MCP transport layer implementations.
//!
//! A transport hands the session two channels: inbound messages from the
//! client and outbound messages to it. The SSE transport streams outbound
//! messages as `message` events on an HTTP response.

use async_trait::async_trait;
use axum::response::sse::Event;
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, trace};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::mcp::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

/// Capacity of each transport channel.
const CHANNEL_CAPACITY: usize = 100;

/// A message that can be sent or received.
#[derive(Debug, Clone)]
pub enum Message {
    Request(JsonRpcRequest),
    Response(JsonRpcResponse),
    Notification(JsonRpcNotification),
}

impl Message {
    /// Parse a JSON-RPC message, trying request, then notification, then response.
    pub fn parse(raw: &str) -> Result<Self> {
        if let Ok(req) = serde_json::from_str::<JsonRpcRequest>(raw) {
            return Ok(Self::Request(req));
        }
        if let Ok(notif) = serde_json::from_str::<JsonRpcNotification>(raw) {
            return Ok(Self::Notification(notif));
        }
        serde_json::from_str::<JsonRpcResponse>(raw)
            .map(Self::Response)
            .map_err(|e| Error::McpProtocol(format!("Not a JSON-RPC message: {}", e)))
    }

    /// Parse from an already decoded JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Self::parse(&value.to_string())
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        let json = match self {
            Self::Request(req) => serde_json::to_string(req)?,
            Self::Response(res) => serde_json::to_string(res)?,
            Self::Notification(notif) => serde_json::to_string(notif)?,
        };
        Ok(json)
    }

    /// Method name for requests and notifications.
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request(req) => Some(&req.method),
            Self::Notification(notif) => Some(&notif.method),
            Self::Response(_) => None,
        }
    }
}

/// Transport trait for MCP communication.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Identifier of the session carried by this transport.
    fn session_id(&self) -> &str;

    /// Start the transport, returning channels for messages.
    async fn start(&mut self) -> Result<(mpsc::Receiver<Message>, mpsc::Sender<Message>)>;

    /// Stop the transport.
    async fn stop(&mut self) -> Result<()>;
}

/// Stream of SSE events backing one HTTP response.
pub type SseEventStream = ReceiverStream<std::result::Result<Event, Infallible>>;

type EventSender = mpsc::Sender<std::result::Result<Event, Infallible>>;

/// Server-Sent Events transport for a single client connection.
pub struct SseTransport {
    endpoint: String,
    session_id: String,
    events: Option<EventSender>,
    /// Keeps the inbound channel open for the life of the session.
    inbound: Option<mpsc::Sender<Message>>,
}

impl SseTransport {
    /// Create a transport whose client posts to `endpoint`.
    ///
    /// Returns the transport and the event stream to hand to the HTTP response.
    pub fn new(endpoint: impl Into<String>) -> (Self, SseEventStream) {
        let (events_tx, events_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let transport = Self {
            endpoint: endpoint.into(),
            session_id: Uuid::new_v4().to_string(),
            events: Some(events_tx),
            inbound: None,
        };

        (transport, ReceiverStream::new(events_rx))
    }

    /// URL the client is told to post messages to.
    pub fn message_endpoint(&self) -> String {
        format!("{}?sessionId={}", self.endpoint, self.session_id)
    }
}

#[async_trait]
impl Transport for SseTransport {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn start(&mut self) -> Result<(mpsc::Receiver<Message>, mpsc::Sender<Message>)> {
        if self.inbound.is_some() {
            return Err(Error::Transport(format!(
                "SSE transport {} already started",
                self.session_id
            )));
        }

        let events = self
            .events
            .clone()
            .ok_or_else(|| Error::Transport("SSE transport has been stopped".to_string()))?;

        let endpoint_event = Event::default()
            .event("endpoint")
            .data(self.message_endpoint());
        events
            .send(Ok(endpoint_event))
            .await
            .map_err(|_| Error::Transport("client disconnected before stream start".to_string()))?;

        let (inbound_tx, inbound_rx) = mpsc::channel::<Message>(CHANNEL_CAPACITY);
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Message>(CHANNEL_CAPACITY);
        self.inbound = Some(inbound_tx);

        let session_id = self.session_id.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = outbound_rx.recv() => {
                        let Some(msg) = msg else { break };
                        let json = match msg.to_json() {
                            Ok(json) => json,
                            Err(e) => {
                                error!("Error serializing message: {}", e);
                                continue;
                            }
                        };
                        trace!("Sending on {}: {}", session_id, json);
                        let event = Event::default().event("message").data(json);
                        if events.send(Ok(event)).await.is_err() {
                            break;
                        }
                    }
                    _ = events.closed() => break,
                }
            }
            debug!("SSE writer for session {} finished", session_id);
        });

        Ok((inbound_rx, outbound_tx))
    }

    async fn stop(&mut self) -> Result<()> {
        self.inbound = None;
        self.events = None;
        Ok(())
    }
}
