use std::sync::Arc;

use tracing::{debug, error, info, info_span, Instrument};

use trrbot_core::tokenize;

use crate::commands::{CommandContext, CommandServices};
use crate::error_handler::handle_command_error;
use crate::events::MessageEvent;
use crate::registry::CommandRegistry;

pub const PROMPT_MESSAGE: &str = "何かコマンドを指定してください。";
pub const DM_ONLY_MESSAGE: &str = "このコマンドはDMでのみ使用できます。";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Empty input; the user was asked for a command.
    Prompted,
    /// A DM-only command outside a direct message.
    Rejected { command: String },
    Executed { command: String },
    /// The command failed and the error handler took over.
    Failed { command: String },
}

/// Turns free text into one command execution.
pub struct CommandDispatcher {
    registry: Arc<CommandRegistry>,
    services: CommandServices,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<CommandRegistry>, services: CommandServices) -> Self {
        Self { registry, services }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub async fn dispatch(&self, text: &str, event: &MessageEvent) -> DispatchOutcome {
        let tokens = tokenize(text);
        let Some((command_token, args)) = tokens.split_first() else {
            self.reply_or_log(event, PROMPT_MESSAGE).await;
            return DispatchOutcome::Prompted;
        };

        let command = self.registry.resolve(command_token);
        let registration = self.registry.resolve_registration(command_token);
        let label = registration
            .map(|registration| registration.primary_name())
            .unwrap_or_else(|| command.name())
            .to_owned();
        let scope = format!("cmd:{label}");

        if registration.is_some_and(|registration| registration.is_dm_only())
            && !event.channel_kind.is_direct_message()
        {
            info!(
                event_name = "command.dispatch.rejected",
                scope = %scope,
                channel = %event.channel_id,
                channel_type = event.channel_kind.as_str(),
                "dm-only command used outside a direct message"
            );
            self.reply_or_log(event, DM_ONLY_MESSAGE).await;
            return DispatchOutcome::Rejected { command: label };
        }

        let ctx = CommandContext {
            event,
            command_name: command_token,
            args,
            services: &self.services,
            registry: &self.registry,
        };

        let span = info_span!(
            "command",
            scope = %scope,
            user = event.user_id.as_deref().unwrap_or("unknown"),
            channel = %event.channel_id,
        );
        async {
            debug!(event_name = "command.dispatch.started", args = args.len(), "executing command");
            match command.execute(&ctx).await {
                Ok(()) => {
                    debug!(event_name = "command.dispatch.executed", "command finished");
                    DispatchOutcome::Executed { command: label }
                }
                Err(error) => {
                    handle_command_error(error, &ctx, Some(&label)).await;
                    DispatchOutcome::Failed { command: label }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn reply_or_log(&self, event: &MessageEvent, text: &str) {
        let result =
            self.services.api.post_message(&event.channel_id, text, event.thread_ts()).await;
        if let Err(reply_error) = result {
            error!(
                event_name = "command.dispatch.reply_failed",
                channel = %event.channel_id,
                error = %reply_error,
                "failed to send dispatch reply"
            );
        }
    }
}
