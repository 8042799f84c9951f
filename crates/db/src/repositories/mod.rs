use async_trait::async_trait;
use thiserror::Error;

use trrbot_core::domain::group::{Group, GroupItem};
use trrbot_core::domain::reaction::ReactionMapping;
use trrbot_core::errors::BotError;

pub mod group;
pub mod memory;
pub mod reaction;

pub use group::SqlGroupRepository;
pub use memory::{InMemoryGroupRepository, InMemoryReactionRepository};
pub use reaction::SqlReactionRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("already exists: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Maps a unique constraint violation to `Conflict`, keeping other failures as they are.
    pub(crate) fn from_insert(error: sqlx::Error, what: impl FnOnce() -> String) -> Self {
        match error {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => Self::Conflict(what()),
            other => Self::Database(other),
        }
    }
}

impl From<RepositoryError> for BotError {
    fn from(error: RepositoryError) -> Self {
        let source = match &error {
            RepositoryError::Database(_) => "database",
            RepositoryError::Decode(_) => "decode",
            RepositoryError::Conflict(what) => {
                return BotError::validation(error.to_string(), format!("{what} は既に存在します。"))
                    .with_context("source", "conflict");
            }
        };
        BotError::database(error.to_string()).with_context("source", source)
    }
}

/// Named lists of items. Groups are addressed by their unique name.
#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Group>, RepositoryError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Group>, RepositoryError>;

    async fn create(&self, name: &str) -> Result<Group, RepositoryError>;

    /// Returns `false` when no group had that name. Items go with the group.
    async fn delete_by_name(&self, name: &str) -> Result<bool, RepositoryError>;

    /// Items in insertion order; empty when the group does not exist.
    async fn items_by_group_name(&self, name: &str) -> Result<Vec<GroupItem>, RepositoryError>;

    /// Inserts all items in one transaction. `None` when the group does not exist.
    async fn add_items(
        &self,
        group_name: &str,
        items: &[String],
    ) -> Result<Option<Vec<GroupItem>>, RepositoryError>;

    async fn remove_item(&self, group_name: &str, item_text: &str)
        -> Result<bool, RepositoryError>;

    /// Number of removed items, or `None` when the group does not exist.
    async fn clear_items(&self, group_name: &str) -> Result<Option<u64>, RepositoryError>;
}

/// Trigger text to emoji mappings, unique per (trigger, reaction) pair.
#[async_trait]
pub trait ReactionRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<ReactionMapping>, RepositoryError>;

    async fn find(
        &self,
        trigger_text: &str,
        reaction: &str,
    ) -> Result<Option<ReactionMapping>, RepositoryError>;

    async fn create(
        &self,
        trigger_text: &str,
        reaction: &str,
    ) -> Result<ReactionMapping, RepositoryError>;

    async fn delete(&self, trigger_text: &str, reaction: &str) -> Result<bool, RepositoryError>;

    async fn increment_usage(
        &self,
        trigger_text: &str,
        reaction: &str,
    ) -> Result<bool, RepositoryError>;
}
