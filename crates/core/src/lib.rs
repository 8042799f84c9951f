pub mod config;
pub mod domain;
pub mod errors;
pub mod random;
pub mod tokenizer;
pub mod validation;

pub use domain::group::{Group, GroupId, GroupItem, GroupItemId};
pub use domain::reaction::{ReactionMapping, ReactionMappingId};
pub use errors::{BotError, BotErrorKind, ErrorContext, Severity};
pub use tokenizer::tokenize;
