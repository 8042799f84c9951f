pub mod connection;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_options, connect_with_settings, DbPool};
pub use repositories::{
    GroupRepository, InMemoryGroupRepository, InMemoryReactionRepository, ReactionRepository,
    RepositoryError, SqlGroupRepository, SqlReactionRepository,
};
