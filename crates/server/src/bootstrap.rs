use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use trrbot_core::config::AppConfig;
use trrbot_db::{
    connect_with_settings, migrations, DbPool, GroupRepository, ReactionRepository,
    SqlGroupRepository, SqlReactionRepository,
};
use trrbot_slack::{
    bot_dispatcher, default_registry, AutoReactionService, CommandDispatcher, CommandServices,
    ReconnectPolicy, RegistryError, SlackApi, SocketModeRunner, SocketTransport,
    WebApiClient, WebSocketTransport,
};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub slack_runner: SocketModeRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("command registry is invalid: {0}")]
    Registry(#[from] RegistryError),
}

/// Wires the bot against Slack's Socket Mode.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let transport: Arc<dyn SocketTransport> =
        Arc::new(WebSocketTransport::new(config.slack.app_token.clone()));
    bootstrap_with_transport(config, transport).await
}

pub async fn bootstrap_with_transport(
    config: AppConfig,
    transport: Arc<dyn SocketTransport>,
) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let api: Arc<dyn SlackApi> = Arc::new(WebApiClient::new(config.slack.bot_token.clone()));
    let groups: Arc<dyn GroupRepository> = Arc::new(SqlGroupRepository::new(db_pool.clone()));
    let reactions: Arc<dyn ReactionRepository> =
        Arc::new(SqlReactionRepository::new(db_pool.clone()));

    let registry = Arc::new(default_registry()?);
    let services = CommandServices {
        api: api.clone(),
        groups,
        reactions: reactions.clone(),
        mention_name: config.bot.mention_name.clone(),
    };
    let commands = Arc::new(CommandDispatcher::new(registry, services));
    let auto_reactions = Arc::new(AutoReactionService::new(api, reactions));
    let events = bot_dispatcher(commands, auto_reactions);
    info!(
        event_name = "system.bootstrap.handlers_registered",
        handlers = events.handler_count(),
        "slack event handlers registered"
    );

    let slack_runner = SocketModeRunner::new(transport, events, ReconnectPolicy::default());

    Ok(Application { config, db_pool, slack_runner })
}
