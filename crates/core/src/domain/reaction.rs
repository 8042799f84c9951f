use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReactionMappingId(pub i64);

/// Adds `reaction` to any channel message containing `trigger_text`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionMapping {
    pub id: ReactionMappingId,
    pub trigger_text: String,
    pub reaction: String,
    pub usage_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReactionMapping {
    pub fn matches(&self, message_text: &str) -> bool {
        message_text.contains(&self.trigger_text)
    }
}

/// Emoji name as the reactions API expects it: `:smile:` becomes `smile`.
pub fn reaction_name(reaction: &str) -> String {
    reaction.trim().replace(':', "")
}
