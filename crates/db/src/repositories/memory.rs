use chrono::Utc;
use tokio::sync::RwLock;

use trrbot_core::domain::group::{Group, GroupId, GroupItem, GroupItemId};
use trrbot_core::domain::reaction::{ReactionMapping, ReactionMappingId};

use super::{GroupRepository, ReactionRepository, RepositoryError};

#[derive(Default)]
struct GroupState {
    next_group_id: i64,
    next_item_id: i64,
    groups: Vec<Group>,
    items: Vec<GroupItem>,
}

impl GroupState {
    fn group_id(&self, name: &str) -> Option<GroupId> {
        self.groups.iter().find(|group| group.name == name).map(|group| group.id)
    }
}

#[derive(Default)]
pub struct InMemoryGroupRepository {
    state: RwLock<GroupState>,
}

#[async_trait::async_trait]
impl GroupRepository for InMemoryGroupRepository {
    async fn list(&self) -> Result<Vec<Group>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.groups.clone())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Group>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.groups.iter().find(|group| group.name == name).cloned())
    }

    async fn create(&self, name: &str) -> Result<Group, RepositoryError> {
        let mut state = self.state.write().await;
        if state.group_id(name).is_some() {
            return Err(RepositoryError::Conflict(format!("グループ名 \"{name}\"")));
        }

        state.next_group_id += 1;
        let now = Utc::now();
        let group = Group {
            id: GroupId(state.next_group_id),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.groups.push(group.clone());
        Ok(group)
    }

    async fn delete_by_name(&self, name: &str) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        let Some(group_id) = state.group_id(name) else {
            return Ok(false);
        };

        state.groups.retain(|group| group.id != group_id);
        state.items.retain(|item| item.group_id != group_id);
        Ok(true)
    }

    async fn items_by_group_name(&self, name: &str) -> Result<Vec<GroupItem>, RepositoryError> {
        let state = self.state.read().await;
        let Some(group_id) = state.group_id(name) else {
            return Ok(Vec::new());
        };

        Ok(state.items.iter().filter(|item| item.group_id == group_id).cloned().collect())
    }

    async fn add_items(
        &self,
        group_name: &str,
        items: &[String],
    ) -> Result<Option<Vec<GroupItem>>, RepositoryError> {
        let mut state = self.state.write().await;
        let Some(group_id) = state.group_id(group_name) else {
            return Ok(None);
        };

        let now = Utc::now();
        let mut inserted = Vec::with_capacity(items.len());
        for item_text in items {
            state.next_item_id += 1;
            inserted.push(GroupItem {
                id: GroupItemId(state.next_item_id),
                group_id,
                item_text: item_text.clone(),
                created_at: now,
            });
        }
        state.items.extend(inserted.iter().cloned());
        if let Some(group) = state.groups.iter_mut().find(|group| group.id == group_id) {
            group.updated_at = now;
        }

        Ok(Some(inserted))
    }

    async fn remove_item(
        &self,
        group_name: &str,
        item_text: &str,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        let Some(group_id) = state.group_id(group_name) else {
            return Ok(false);
        };

        let before = state.items.len();
        state.items.retain(|item| !(item.group_id == group_id && item.item_text == item_text));
        Ok(state.items.len() < before)
    }

    async fn clear_items(&self, group_name: &str) -> Result<Option<u64>, RepositoryError> {
        let mut state = self.state.write().await;
        let Some(group_id) = state.group_id(group_name) else {
            return Ok(None);
        };

        let before = state.items.len();
        state.items.retain(|item| item.group_id != group_id);
        Ok(Some((before - state.items.len()) as u64))
    }
}

#[derive(Default)]
pub struct InMemoryReactionRepository {
    mappings: RwLock<Vec<ReactionMapping>>,
}

#[async_trait::async_trait]
impl ReactionRepository for InMemoryReactionRepository {
    async fn list(&self) -> Result<Vec<ReactionMapping>, RepositoryError> {
        let mappings = self.mappings.read().await;
        Ok(mappings.clone())
    }

    async fn find(
        &self,
        trigger_text: &str,
        reaction: &str,
    ) -> Result<Option<ReactionMapping>, RepositoryError> {
        let mappings = self.mappings.read().await;
        Ok(mappings
            .iter()
            .find(|mapping| mapping.trigger_text == trigger_text && mapping.reaction == reaction)
            .cloned())
    }

    async fn create(
        &self,
        trigger_text: &str,
        reaction: &str,
    ) -> Result<ReactionMapping, RepositoryError> {
        let mut mappings = self.mappings.write().await;
        if mappings
            .iter()
            .any(|mapping| mapping.trigger_text == trigger_text && mapping.reaction == reaction)
        {
            return Err(RepositoryError::Conflict(format!(
                "リアクションマッピング \"{trigger_text}\" → {reaction}"
            )));
        }

        let next_id = mappings.iter().map(|mapping| mapping.id.0).max().unwrap_or(0) + 1;
        let now = Utc::now();
        let mapping = ReactionMapping {
            id: ReactionMappingId(next_id),
            trigger_text: trigger_text.to_string(),
            reaction: reaction.to_string(),
            usage_count: 0,
            created_at: now,
            updated_at: now,
        };
        mappings.push(mapping.clone());
        Ok(mapping)
    }

    async fn delete(&self, trigger_text: &str, reaction: &str) -> Result<bool, RepositoryError> {
        let mut mappings = self.mappings.write().await;
        let before = mappings.len();
        mappings.retain(|mapping| {
            !(mapping.trigger_text == trigger_text && mapping.reaction == reaction)
        });
        Ok(mappings.len() < before)
    }

    async fn increment_usage(
        &self,
        trigger_text: &str,
        reaction: &str,
    ) -> Result<bool, RepositoryError> {
        let mut mappings = self.mappings.write().await;
        match mappings
            .iter_mut()
            .find(|mapping| mapping.trigger_text == trigger_text && mapping.reaction == reaction)
        {
            Some(mapping) => {
                mapping.usage_count += 1;
                mapping.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
