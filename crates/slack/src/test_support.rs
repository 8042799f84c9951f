//! Fakes and fixtures shared by the crate's tests.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use trrbot_core::domain::group::{Group, GroupItem};
use trrbot_db::{
    GroupRepository, InMemoryGroupRepository, InMemoryReactionRepository, ReactionRepository,
    RepositoryError,
};

use crate::client::{ApiError, FileUpload, PostedMessage, SlackApi};
use crate::commands::CommandServices;
use crate::dispatch::{CommandDispatcher, DispatchOutcome};
use crate::events::{ChannelKind, MessageEvent};
use crate::registry::{default_registry, CommandRegistry};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn channel_event(text: &str) -> MessageEvent {
    MessageEvent {
        text: text.to_owned(),
        ts: "1700000000.000100".to_owned(),
        thread_ts: None,
        channel_id: "C0TEAM".to_owned(),
        channel_kind: ChannelKind::PublicChannel,
        user_id: Some("U0ALICE".to_owned()),
        subtype: None,
    }
}

pub(crate) fn dm_event(text: &str) -> MessageEvent {
    MessageEvent {
        channel_id: "D0ALICE".to_owned(),
        channel_kind: ChannelKind::DirectMessage,
        ..channel_event(text)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SentMessage {
    pub channel: String,
    pub text: String,
    pub thread_ts: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct AddedReaction {
    pub channel: String,
    pub ts: String,
    pub name: String,
}

/// Records every call; can be told to fail posts or specific reactions.
#[derive(Default)]
pub(crate) struct RecordingSlackApi {
    messages: Mutex<Vec<SentMessage>>,
    reactions: Mutex<Vec<AddedReaction>>,
    uploads: Mutex<Vec<FileUpload>>,
    fail_posts: AtomicBool,
    failing_reactions: Mutex<HashSet<String>>,
}

impl RecordingSlackApi {
    pub fn messages(&self) -> Vec<SentMessage> {
        lock(&self.messages).clone()
    }

    pub fn single_message(&self) -> SentMessage {
        let messages = self.messages();
        assert_eq!(messages.len(), 1, "expected exactly one message, got {messages:?}");
        messages[0].clone()
    }

    pub fn reactions(&self) -> Vec<AddedReaction> {
        lock(&self.reactions).clone()
    }

    pub fn uploads(&self) -> Vec<FileUpload> {
        lock(&self.uploads).clone()
    }

    pub fn fail_posts(&self) {
        self.fail_posts.store(true, Ordering::SeqCst);
    }

    pub fn fail_reaction(&self, name: &str) {
        lock(&self.failing_reactions).insert(name.to_owned());
    }
}

#[async_trait]
impl SlackApi for RecordingSlackApi {
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<PostedMessage, ApiError> {
        if self.fail_posts.load(Ordering::SeqCst) {
            return Err(ApiError::Slack {
                method: "chat.postMessage".to_owned(),
                error: "channel_not_found".to_owned(),
            });
        }

        let mut messages = lock(&self.messages);
        messages.push(SentMessage {
            channel: channel.to_owned(),
            text: text.to_owned(),
            thread_ts: thread_ts.map(str::to_owned),
        });
        let ts = format!("1700000001.{:06}", messages.len());
        Ok(PostedMessage { channel: channel.to_owned(), ts })
    }

    async fn add_reaction(&self, channel: &str, ts: &str, name: &str) -> Result<(), ApiError> {
        if lock(&self.failing_reactions).contains(name) {
            return Err(ApiError::Slack {
                method: "reactions.add".to_owned(),
                error: "invalid_name".to_owned(),
            });
        }

        lock(&self.reactions).push(AddedReaction {
            channel: channel.to_owned(),
            ts: ts.to_owned(),
            name: name.to_owned(),
        });
        Ok(())
    }

    async fn upload_file(&self, upload: FileUpload) -> Result<(), ApiError> {
        lock(&self.uploads).push(upload);
        Ok(())
    }
}

/// Group store whose every call fails with the same storage error.
pub(crate) struct FailingGroupRepository {
    message: String,
}

impl FailingGroupRepository {
    pub fn new(message: &str) -> Self {
        Self { message: message.to_owned() }
    }

    fn error(&self) -> RepositoryError {
        RepositoryError::Decode(self.message.clone())
    }
}

#[async_trait]
impl GroupRepository for FailingGroupRepository {
    async fn list(&self) -> Result<Vec<Group>, RepositoryError> {
        Err(self.error())
    }

    async fn find_by_name(&self, _name: &str) -> Result<Option<Group>, RepositoryError> {
        Err(self.error())
    }

    async fn create(&self, _name: &str) -> Result<Group, RepositoryError> {
        Err(self.error())
    }

    async fn delete_by_name(&self, _name: &str) -> Result<bool, RepositoryError> {
        Err(self.error())
    }

    async fn items_by_group_name(&self, _name: &str) -> Result<Vec<GroupItem>, RepositoryError> {
        Err(self.error())
    }

    async fn add_items(
        &self,
        _group_name: &str,
        _items: &[String],
    ) -> Result<Option<Vec<GroupItem>>, RepositoryError> {
        Err(self.error())
    }

    async fn remove_item(
        &self,
        _group_name: &str,
        _item_text: &str,
    ) -> Result<bool, RepositoryError> {
        Err(self.error())
    }

    async fn clear_items(&self, _group_name: &str) -> Result<Option<u64>, RepositoryError> {
        Err(self.error())
    }
}

/// In-memory groups whose lookups never see existing names, so a create can
/// race past the duplicate check and hit the store's own conflict.
#[derive(Default)]
pub(crate) struct StaleLookupGroupRepository {
    inner: InMemoryGroupRepository,
}

#[async_trait]
impl GroupRepository for StaleLookupGroupRepository {
    async fn list(&self) -> Result<Vec<Group>, RepositoryError> {
        self.inner.list().await
    }

    async fn find_by_name(&self, _name: &str) -> Result<Option<Group>, RepositoryError> {
        Ok(None)
    }

    async fn create(&self, name: &str) -> Result<Group, RepositoryError> {
        self.inner.create(name).await
    }

    async fn delete_by_name(&self, name: &str) -> Result<bool, RepositoryError> {
        self.inner.delete_by_name(name).await
    }

    async fn items_by_group_name(&self, name: &str) -> Result<Vec<GroupItem>, RepositoryError> {
        self.inner.items_by_group_name(name).await
    }

    async fn add_items(
        &self,
        group_name: &str,
        items: &[String],
    ) -> Result<Option<Vec<GroupItem>>, RepositoryError> {
        self.inner.add_items(group_name, items).await
    }

    async fn remove_item(
        &self,
        group_name: &str,
        item_text: &str,
    ) -> Result<bool, RepositoryError> {
        self.inner.remove_item(group_name, item_text).await
    }

    async fn clear_items(&self, group_name: &str) -> Result<Option<u64>, RepositoryError> {
        self.inner.clear_items(group_name).await
    }
}

/// The default registry wired to recording and in-memory collaborators.
pub(crate) struct TestBot {
    pub api: Arc<RecordingSlackApi>,
    pub groups: Arc<dyn GroupRepository>,
    pub reactions: Arc<InMemoryReactionRepository>,
    registry: Arc<CommandRegistry>,
}

impl TestBot {
    pub fn new() -> Self {
        Self::with_groups(InMemoryGroupRepository::default())
    }

    pub fn with_groups(groups: impl GroupRepository + 'static) -> Self {
        Self {
            api: Arc::new(RecordingSlackApi::default()),
            groups: Arc::new(groups),
            reactions: Arc::new(InMemoryReactionRepository::default()),
            registry: Arc::new(default_registry().expect("default registry")),
        }
    }

    pub fn services(&self) -> CommandServices {
        CommandServices {
            api: self.api.clone(),
            groups: self.groups.clone(),
            reactions: self.reactions.clone(),
            mention_name: "@trrbot".to_owned(),
        }
    }

    pub fn registry(&self) -> Arc<CommandRegistry> {
        self.registry.clone()
    }

    pub fn dispatcher(&self) -> CommandDispatcher {
        CommandDispatcher::new(self.registry(), self.services())
    }

    pub async fn run(&self, text: &str, event: MessageEvent) -> DispatchOutcome {
        self.dispatcher().dispatch(text, &event).await
    }

    pub async fn seed_group(&self, name: &str, items: &[&str]) {
        self.groups.create(name).await.expect("seed group");
        if !items.is_empty() {
            let items: Vec<String> = items.iter().map(|item| item.to_string()).collect();
            self.groups.add_items(name, &items).await.expect("seed items");
        }
    }

    pub async fn seed_reaction(&self, trigger_text: &str, reaction: &str) {
        self.reactions.create(trigger_text, reaction).await.expect("seed reaction");
    }
}

#[derive(Clone, Debug)]
pub(crate) struct CapturedEvent {
    pub level: Level,
    fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

#[derive(Default)]
struct FieldRecorder(BTreeMap<String, String>);

impl Visit for FieldRecorder {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_owned(), value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_owned(), format!("{value:?}"));
    }
}

/// Collects events emitted on the current thread while installed.
#[derive(Clone, Default)]
pub(crate) struct LogCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl LogCapture {
    pub fn install(&self) -> DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        lock(&self.events).clone()
    }

    pub fn events_at(&self, level: Level) -> Vec<CapturedEvent> {
        self.events().into_iter().filter(|event| event.level == level).collect()
    }

    pub fn events_with(&self, name: &str, value: &str) -> Vec<CapturedEvent> {
        self.events().into_iter().filter(|event| event.field(name) == Some(value)).collect()
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut recorder = FieldRecorder::default();
        event.record(&mut recorder);
        let level = *event.metadata().level();
        lock(&self.events).push(CapturedEvent { level, fields: recorder.0 });
    }
}
