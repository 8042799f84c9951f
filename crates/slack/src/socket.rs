use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::client::{check_ok, DEFAULT_API_BASE_URL};
use crate::events::{EventContext, EventDispatcher, SlackEnvelope, SlackEvent};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Debug, Error)]
pub enum SocketError {
    #[error("socket mode gave up after {attempts} failed connections: {last}")]
    RetriesExhausted { attempts: u32, last: TransportError },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect number `attempt + 1`: doubles from the base, capped.
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u64.saturating_pow(attempt);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms))
    }
}

#[async_trait]
pub trait SocketTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    /// `Ok(None)` ends the runner; errors make it reconnect.
    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopSocketTransport;

#[async_trait]
impl SocketTransport for NoopSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
        Ok(None)
    }

    async fn acknowledge(&self, _envelope_id: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// One frame of the Socket Mode protocol, as far as the bot cares.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SocketMessage {
    Hello,
    /// Slack is about to close the connection and wants a new one opened.
    Disconnect { reason: String },
    Envelope(SlackEnvelope),
    Ignored,
}

impl SocketMessage {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        let message: Value = serde_json::from_str(raw)?;
        let message_type = message.get("type").and_then(Value::as_str).unwrap_or_default();

        let parsed = match message_type {
            "hello" => Self::Hello,
            "disconnect" => Self::Disconnect {
                reason: message
                    .get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_owned(),
            },
            _ => match message.get("envelope_id").and_then(Value::as_str) {
                Some(envelope_id) => {
                    let event = match (message_type, message.pointer("/payload/event")) {
                        ("events_api", Some(event)) => SlackEvent::from_payload(event),
                        _ => SlackEvent::Unsupported { event_type: message_type.to_owned() },
                    };
                    Self::Envelope(SlackEnvelope { envelope_id: envelope_id.to_owned(), event })
                }
                None => Self::Ignored,
            },
        };
        Ok(parsed)
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Socket Mode over a websocket opened with the app-level token.
pub struct WebSocketTransport {
    http: Client,
    api_base_url: String,
    app_token: SecretString,
    stream: Mutex<Option<WsStream>>,
}

impl WebSocketTransport {
    pub fn new(app_token: SecretString) -> Self {
        Self {
            http: Client::new(),
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            app_token,
            stream: Mutex::new(None),
        }
    }

    async fn open_connection_url(&self) -> Result<String, TransportError> {
        let method = "apps.connections.open";
        let response = self
            .http
            .post(format!("{}/{method}", self.api_base_url))
            .bearer_auth(self.app_token.expose_secret())
            .send()
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;
        let payload: Value =
            response.json().await.map_err(|error| TransportError::Connect(error.to_string()))?;
        let payload = check_ok(method, payload)
            .map_err(|error| TransportError::Connect(error.to_string()))?;

        payload
            .get("url")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| TransportError::Connect(format!("`{method}` returned no url")))
    }
}

#[async_trait]
impl SocketTransport for WebSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let url = self.open_connection_url().await?;
        let (stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;
        *self.stream.lock().await = Some(stream);
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
        let mut guard = self.stream.lock().await;
        let Some(stream) = guard.as_mut() else {
            return Err(TransportError::Receive("not connected".to_owned()));
        };

        loop {
            match stream.next().await {
                Some(Ok(WsMessage::Text(text))) => match SocketMessage::parse(&text) {
                    Ok(SocketMessage::Envelope(envelope)) => return Ok(Some(envelope)),
                    Ok(SocketMessage::Hello) => {
                        debug!(event_name = "ingress.slack.hello", "socket mode hello")
                    }
                    Ok(SocketMessage::Disconnect { reason }) => {
                        let reason = format!("server requested reconnect: {reason}");
                        return Err(TransportError::Receive(reason));
                    }
                    Ok(SocketMessage::Ignored) => {}
                    Err(error) => warn!(
                        event_name = "ingress.slack.malformed_frame",
                        error = %error,
                        "skipping malformed socket mode frame"
                    ),
                },
                // Lost connection; the runner reconnects.
                Some(Ok(WsMessage::Close(_))) | None => {
                    return Err(TransportError::Receive("connection closed by server".to_owned()));
                }
                Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => {}
                Some(Ok(WsMessage::Frame(_) | WsMessage::Binary(_))) => {}
                Some(Err(error)) => return Err(TransportError::Receive(error.to_string())),
            }
        }
    }

    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError> {
        let mut guard = self.stream.lock().await;
        let Some(stream) = guard.as_mut() else {
            return Err(TransportError::Acknowledge("not connected".to_owned()));
        };

        let ack = json!({ "envelope_id": envelope_id }).to_string();
        stream
            .send(WsMessage::Text(ack))
            .await
            .map_err(|error| TransportError::Acknowledge(error.to_string()))
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let Some(mut stream) = self.stream.lock().await.take() else {
            return Ok(());
        };
        stream.close(None).await.map_err(|error| TransportError::Disconnect(error.to_string()))
    }
}

/// Pumps envelopes from the transport into the event dispatcher.
///
/// Every envelope is acknowledged, then dispatched on its own task so a slow handler never
/// holds up the stream. A failed dispatch is logged and the loop continues. Lost connections
/// are reopened with capped exponential backoff; the failure budget resets whenever a
/// connection succeeds.
pub struct SocketModeRunner {
    transport: Arc<dyn SocketTransport>,
    dispatcher: Arc<EventDispatcher>,
    reconnect_policy: ReconnectPolicy,
}

impl SocketModeRunner {
    pub fn new(
        transport: Arc<dyn SocketTransport>,
        dispatcher: EventDispatcher,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher: Arc::new(dispatcher), reconnect_policy }
    }

    /// Returns `Ok` when the server closes the stream cleanly.
    pub async fn start(&self) -> Result<(), SocketError> {
        let mut failures: u32 = 0;
        loop {
            info!(
                event_name = "ingress.slack.connecting",
                failures,
                "opening socket mode connection"
            );
            let result = match self.transport.connect().await {
                Ok(()) => {
                    failures = 0;
                    info!(event_name = "ingress.slack.connected", "socket mode connected");
                    self.pump().await
                }
                Err(error) => Err(error),
            };

            let Err(transport_error) = result else {
                return Ok(());
            };

            failures += 1;
            warn!(
                event_name = "ingress.slack.connection_lost",
                failures,
                max_retries = self.reconnect_policy.max_retries,
                error = %transport_error,
                "socket mode transport failed"
            );
            if failures > self.reconnect_policy.max_retries {
                return Err(SocketError::RetriesExhausted {
                    attempts: failures,
                    last: transport_error,
                });
            }

            let delay = self.reconnect_policy.backoff(failures - 1);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    async fn pump(&self) -> Result<(), TransportError> {
        loop {
            let envelope = match self.transport.next_envelope().await {
                Ok(Some(envelope)) => envelope,
                Ok(None) => {
                    info!(event_name = "ingress.slack.stream_closed", "socket mode stream closed");
                    return self.transport.disconnect().await;
                }
                Err(error) => {
                    if let Err(disconnect_error) = self.transport.disconnect().await {
                        debug!(
                            error = %disconnect_error,
                            "disconnect after read failure also failed"
                        );
                    }
                    return Err(error);
                }
            };

            debug!(
                event_name = "ingress.slack.envelope_received",
                envelope_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                "received slack envelope"
            );

            if let Err(error) = self.transport.acknowledge(&envelope.envelope_id).await {
                warn!(
                    event_name = "ingress.slack.ack_failed",
                    envelope_id = %envelope.envelope_id,
                    error = %error,
                    "failed to acknowledge slack envelope"
                );
            }

            let dispatcher = self.dispatcher.clone();
            tokio::spawn(async move {
                let context = EventContext { correlation_id: envelope.envelope_id.clone() };
                if let Err(error) = dispatcher.dispatch(&envelope, &context).await {
                    error!(
                        event_name = "ingress.slack.dispatch_failed",
                        envelope_id = %envelope.envelope_id,
                        error = %error,
                        "event dispatch failed; continuing socket loop"
                    );
                }
            });
        }
    }
}
