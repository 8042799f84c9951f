use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use trrbot_db::RepositoryError;

use crate::dispatch::{CommandDispatcher, DispatchOutcome};
use crate::reactions::AutoReactionService;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    DirectMessage,
    GroupDirectMessage,
    PublicChannel,
    PrivateChannel,
    Unknown,
}

impl ChannelKind {
    /// Maps Slack's `channel_type`. Without one, `D…` channel ids are direct messages.
    pub fn from_slack(channel_type: Option<&str>, channel_id: &str) -> Self {
        match channel_type {
            Some("im") => Self::DirectMessage,
            Some("mpim") => Self::GroupDirectMessage,
            Some("channel") => Self::PublicChannel,
            Some("group") => Self::PrivateChannel,
            Some(_) => Self::Unknown,
            None if channel_id.starts_with('D') => Self::DirectMessage,
            None => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectMessage => "im",
            Self::GroupDirectMessage => "mpim",
            Self::PublicChannel => "channel",
            Self::PrivateChannel => "group",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_direct_message(&self) -> bool {
        matches!(self, Self::DirectMessage)
    }
}

/// A mention or plain message as delivered by the Events API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub text: String,
    pub ts: String,
    pub thread_ts: Option<String>,
    pub channel_id: String,
    pub channel_kind: ChannelKind,
    pub user_id: Option<String>,
    pub subtype: Option<String>,
}

impl MessageEvent {
    /// Thread to answer in for replies that should stay in a thread the user already
    /// opened, and otherwise go to the channel.
    pub fn thread_ts(&self) -> Option<&str> {
        self.thread_ts.as_deref()
    }

    /// Thread to answer in for replies that always go to a thread.
    pub fn thread_or_ts(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(&self.ts)
    }

    pub fn from_payload(event: &Value) -> Option<Self> {
        let str_field = |key: &str| event.get(key).and_then(Value::as_str).map(str::to_owned);
        let channel_id = str_field("channel")?;
        let channel_type = event.get("channel_type").and_then(Value::as_str);

        Some(Self {
            text: str_field("text").unwrap_or_default(),
            ts: str_field("ts")?,
            thread_ts: str_field("thread_ts"),
            channel_kind: ChannelKind::from_slack(channel_type, &channel_id),
            channel_id,
            user_id: str_field("user"),
            subtype: str_field("subtype"),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    AppMention(MessageEvent),
    Message(MessageEvent),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::AppMention(_) => SlackEventType::AppMention,
            Self::Message(_) => SlackEventType::Message,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }

    /// Parses the inner `event` object of an `event_callback` payload.
    pub fn from_payload(event: &Value) -> Self {
        let event_type = event.get("type").and_then(Value::as_str).unwrap_or("unknown");
        let parsed = match event_type {
            "app_mention" => MessageEvent::from_payload(event).map(Self::AppMention),
            "message" => MessageEvent::from_payload(event).map(Self::Message),
            _ => None,
        };
        parsed.unwrap_or_else(|| Self::Unsupported { event_type: event_type.to_owned() })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    AppMention,
    Message,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Dispatched(DispatchOutcome),
    Reacted { added: usize },
    Ignored,
}

#[derive(Debug, Error)]
pub enum EventHandlerError {
    #[error("auto reaction failed: {0}")]
    AutoReaction(#[from] RepositoryError),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Wires mention and message handling around one command dispatcher.
pub fn bot_dispatcher(
    commands: Arc<CommandDispatcher>,
    auto_reactions: Arc<AutoReactionService>,
) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(MentionHandler::new(commands.clone()));
    dispatcher.register(MessageHandler::new(commands, auto_reactions));
    dispatcher
}

/// Removes the bot's own mention from the start of the text:
/// `<@U123> gc lunch <@U456>` becomes `gc lunch <@U456>`.
pub fn strip_leading_mention(text: &str) -> &str {
    let trimmed = text.trim_start();
    let Some(rest) = trimmed.strip_prefix("<@") else {
        return text.trim();
    };
    let Some(end) = rest.find('>') else {
        return text.trim();
    };
    let user_id = &rest[..end];
    let is_user_id = !user_id.is_empty()
        && user_id.chars().all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit());
    if !is_user_id {
        return text.trim();
    }
    rest[end + 1..].trim()
}

pub struct MentionHandler {
    commands: Arc<CommandDispatcher>,
}

impl MentionHandler {
    pub fn new(commands: Arc<CommandDispatcher>) -> Self {
        Self { commands }
    }
}

#[async_trait]
impl EventHandler for MentionHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::AppMention
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::AppMention(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let text = strip_leading_mention(&event.text);
        let outcome = self.commands.dispatch(text, event).await;
        Ok(HandlerResult::Dispatched(outcome))
    }
}

/// Plain messages: commands in direct messages, auto reactions everywhere else.
pub struct MessageHandler {
    commands: Arc<CommandDispatcher>,
    auto_reactions: Arc<AutoReactionService>,
}

impl MessageHandler {
    pub fn new(commands: Arc<CommandDispatcher>, auto_reactions: Arc<AutoReactionService>) -> Self {
        Self { commands, auto_reactions }
    }
}

#[async_trait]
impl EventHandler for MessageHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::Message
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::Message(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        if event.subtype.is_some() || event.text.trim().is_empty() {
            debug!(
                event_name = "ingress.slack.message_skipped",
                correlation_id = %ctx.correlation_id,
                subtype = event.subtype.as_deref().unwrap_or("none"),
                "skipping message without text or with subtype"
            );
            return Ok(HandlerResult::Ignored);
        }

        if event.channel_kind.is_direct_message() {
            let outcome = self.commands.dispatch(&event.text, event).await;
            return Ok(HandlerResult::Dispatched(outcome));
        }

        let added = self.auto_reactions.react(event).await?;
        Ok(HandlerResult::Reacted { added })
    }
}
