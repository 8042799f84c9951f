use std::sync::Arc;

use tracing::{debug, warn};

use trrbot_core::domain::reaction::{reaction_name, ReactionMapping};
use trrbot_db::{ReactionRepository, RepositoryError};

use crate::client::SlackApi;
use crate::events::MessageEvent;

/// Adds mapped emoji reactions to channel messages containing a trigger text.
pub struct AutoReactionService {
    api: Arc<dyn SlackApi>,
    reactions: Arc<dyn ReactionRepository>,
}

impl AutoReactionService {
    pub fn new(api: Arc<dyn SlackApi>, reactions: Arc<dyn ReactionRepository>) -> Self {
        Self { api, reactions }
    }

    /// Returns how many reactions were added. Only loading the mappings can fail; a
    /// reaction that cannot be added or counted is logged and skipped.
    pub async fn react(&self, event: &MessageEvent) -> Result<usize, RepositoryError> {
        let mappings = self.reactions.list().await?;
        let matched = distinct_reactions(&mappings, &event.text);
        if matched.is_empty() {
            return Ok(0);
        }

        let mut added = 0;
        for mapping in matched {
            let name = reaction_name(&mapping.reaction);
            if let Err(error) = self.api.add_reaction(&event.channel_id, &event.ts, &name).await {
                warn!(
                    event_name = "reaction.auto.add_failed",
                    reaction = %name,
                    channel = %event.channel_id,
                    error = %error,
                    "failed to add reaction"
                );
                continue;
            }
            added += 1;

            if let Err(error) =
                self.reactions.increment_usage(&mapping.trigger_text, &mapping.reaction).await
            {
                warn!(
                    event_name = "reaction.auto.count_failed",
                    trigger_text = %mapping.trigger_text,
                    reaction = %mapping.reaction,
                    error = %error,
                    "failed to increment reaction usage"
                );
            }
        }

        debug!(
            event_name = "reaction.auto.applied",
            added,
            channel = %event.channel_id,
            "auto reactions applied"
        );
        Ok(added)
    }
}

/// First matching mapping per reaction, in mapping order.
fn distinct_reactions<'a>(mappings: &'a [ReactionMapping], text: &str) -> Vec<&'a ReactionMapping> {
    let mut seen: Vec<&'a ReactionMapping> = Vec::new();
    for mapping in mappings.iter().filter(|mapping| mapping.matches(text)) {
        if !seen.iter().any(|existing| existing.reaction == mapping.reaction) {
            seen.push(mapping);
        }
    }
    seen
}
