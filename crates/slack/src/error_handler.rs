//! Last stop for every command failure: one structured log entry, one reply.

use std::backtrace::BacktraceStatus;

use serde_json::Value;
use tracing::{error, warn};

use trrbot_core::errors::{BotError, ErrorContext, Severity, GENERIC_USER_MESSAGE};

use crate::commands::{CommandContext, CommandError};

/// What gets logged and shown for one failure.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorReport {
    pub error_name: String,
    pub internal_message: String,
    pub user_message: String,
    pub severity: Severity,
    pub retryable: bool,
    pub context: ErrorContext,
}

impl ErrorReport {
    pub fn classify(error: &CommandError) -> Self {
        match error {
            CommandError::Bot(bot) => Self::from_bot_error(bot),
            CommandError::Unexpected { error: source, error_type } => {
                let mut context = ErrorContext::new();
                if let Some(error_type) = error_type {
                    context.insert("error_type".to_owned(), Value::from(*error_type));
                }
                let root_cause = source.root_cause().to_string();
                context.insert("root_cause".to_owned(), Value::from(root_cause));
                let chain: Vec<Value> =
                    source.chain().skip(1).map(|cause| Value::from(cause.to_string())).collect();
                if !chain.is_empty() {
                    context.insert("causes".to_owned(), Value::from(chain));
                }
                let backtrace = source.backtrace();
                if backtrace.status() == BacktraceStatus::Captured {
                    context.insert("backtrace".to_owned(), Value::from(backtrace.to_string()));
                }
                Self::unclassified("Error", source.to_string(), context)
            }
            CommandError::Raw(message) => {
                let mut context = ErrorContext::new();
                context.insert("error_type".to_owned(), Value::from("string"));
                Self::unclassified("UnknownError", message.clone(), context)
            }
        }
    }

    fn from_bot_error(error: &BotError) -> Self {
        Self {
            error_name: error.name().to_owned(),
            internal_message: error.internal_message().to_owned(),
            user_message: error.user_message().to_owned(),
            severity: error.severity(),
            retryable: error.is_retryable(),
            context: error.context().clone(),
        }
    }

    fn unclassified(error_name: &str, internal_message: String, context: ErrorContext) -> Self {
        let error =
            BotError::generic(internal_message, GENERIC_USER_MESSAGE, false, Severity::Error);
        Self { error_name: error_name.to_owned(), context, ..Self::from_bot_error(&error) }
    }

    /// The context map as one JSON object, so structured formatters keep its keys.
    pub fn context_json(&self) -> Value {
        Value::Object(self.context.clone().into_iter().collect())
    }
}

macro_rules! log_report {
    ($level:ident, $report:expr, $scope:expr, $command:expr, $event:expr) => {
        $level!(
            event_name = "command.error.handled",
            scope = %$scope,
            command = %$command,
            user = $event.user_id.as_deref().unwrap_or("unknown"),
            channel = %$event.channel_id,
            channel_type = $event.channel_kind.as_str(),
            timestamp = %$event.ts,
            error_name = %$report.error_name,
            retryable = $report.retryable,
            context = %$report.context_json(),
            "{}",
            $report.internal_message
        )
    };
}

/// Logs `error` once at its severity and replies with its user message.
///
/// Never fails. When the reply cannot be sent, a second entry at error level records that
/// and the original failure stays logged as is.
pub async fn handle_command_error(
    error: CommandError,
    ctx: &CommandContext<'_>,
    command_name: Option<&str>,
) {
    let report = ErrorReport::classify(&error);
    let command = command_name.unwrap_or(ctx.command_name);
    let scope = format!("cmd:{command}");
    let event = ctx.event;

    match report.severity {
        Severity::Warn => log_report!(warn, report, scope, command, event),
        Severity::Error => log_report!(error, report, scope, command, event),
    }

    if let Err(reply_error) = ctx.say(&report.user_message).await {
        error!(
            event_name = "command.error.reply_failed",
            scope = %scope,
            command = %command,
            channel = %event.channel_id,
            original_error = %report.internal_message,
            reply_error = %reply_error,
            "Failed to send error message to user"
        );
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use serde_json::json;
    use tracing::Level;

    use trrbot_core::errors::{
        BotError, Severity, GENERIC_USER_MESSAGE, SLACK_API_USER_MESSAGE,
    };

    use super::{handle_command_error, ErrorReport};
    use crate::client::ApiError;
    use crate::commands::{CommandContext, CommandError};
    use crate::test_support::{channel_event, LogCapture, TestBot};

    #[test]
    fn bot_errors_keep_their_own_fields() {
        let error: CommandError = BotError::validation("name too long", "長すぎます")
            .with_context("length", 51)
            .into();

        let report = ErrorReport::classify(&error);

        assert_eq!(report.error_name, "ValidationError");
        assert_eq!(report.user_message, "長すぎます");
        assert_eq!(report.severity, Severity::Warn);
        assert!(!report.retryable);
        assert_eq!(report.context.get("length"), Some(&json!(51)));
    }

    #[test]
    fn slack_api_failures_are_retryable_errors() {
        let error: CommandError = ApiError::Slack {
            method: "chat.postMessage".to_owned(),
            error: "ratelimited".to_owned(),
        }
        .into();

        let report = ErrorReport::classify(&error);

        assert_eq!(report.error_name, "SlackAPIError");
        assert_eq!(report.user_message, SLACK_API_USER_MESSAGE);
        assert_eq!(report.severity, Severity::Error);
        assert!(report.retryable);
    }

    #[test]
    fn unexpected_errors_get_generic_treatment() {
        let error = CommandError::from(anyhow!("socket closed").context("reading reply"));

        let report = ErrorReport::classify(&error);

        assert_eq!(report.internal_message, "reading reply");
        assert_eq!(report.user_message, GENERIC_USER_MESSAGE);
        assert_eq!(report.severity, Severity::Error);
        assert!(!report.retryable);
        assert_eq!(report.context.get("causes"), Some(&json!(["socket closed"])));
        assert_eq!(report.context.get("root_cause"), Some(&json!("socket closed")));
    }

    #[test]
    fn typed_unexpected_errors_record_their_type_name() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "upload stalled");
        let report = ErrorReport::classify(&CommandError::unexpected(io));

        assert_eq!(report.error_name, "Error");
        assert_eq!(report.internal_message, "upload stalled");
        let error_type = report.context.get("error_type").and_then(|value| value.as_str());
        assert!(error_type.is_some_and(|name| name.starts_with("std::io::")), "{error_type:?}");
        assert_eq!(report.context.get("root_cause"), Some(&json!("upload stalled")));
    }

    #[test]
    fn raw_values_use_their_text_as_internal_message() {
        let report = ErrorReport::classify(&CommandError::Raw("boom".to_owned()));

        assert_eq!(report.internal_message, "boom");
        assert_eq!(report.error_name, "UnknownError");
        assert_eq!(report.user_message, GENERIC_USER_MESSAGE);
        assert_eq!(report.severity, Severity::Error);
        assert_eq!(report.context.get("error_type"), Some(&json!("string")));
    }

    #[tokio::test]
    async fn log_entry_context_is_a_json_object() {
        let capture = LogCapture::default();
        let _guard = capture.install();
        let bot = TestBot::new();
        let services = bot.services();
        let registry = bot.registry();
        let event = channel_event("");
        let args = Vec::new();
        let ctx = CommandContext {
            event: &event,
            command_name: "group",
            args: &args,
            services: &services,
            registry: &registry,
        };
        let error = BotError::validation("name too long", "長すぎます")
            .with_context("length", 51)
            .with_context("group_name", "lunch");

        handle_command_error(error.into(), &ctx, None).await;

        let warnings = capture.events_at(Level::WARN);
        assert_eq!(warnings.len(), 1);
        let raw = warnings[0].field("context").expect("context field");
        let context: serde_json::Value = serde_json::from_str(raw).expect("context is json");
        assert_eq!(context, json!({ "group_name": "lunch", "length": 51 }));
    }

    #[tokio::test]
    async fn log_entry_carries_event_fields() {
        let capture = LogCapture::default();
        let _guard = capture.install();
        let bot = TestBot::new();
        let services = bot.services();
        let registry = bot.registry();
        let event = channel_event("");
        let args = Vec::new();
        let ctx = CommandContext {
            event: &event,
            command_name: "gc",
            args: &args,
            services: &services,
            registry: &registry,
        };

        handle_command_error(CommandError::Raw("boom".to_owned()), &ctx, None).await;

        let errors = capture.events_at(Level::ERROR);
        assert_eq!(errors.len(), 1);
        let entry = &errors[0];
        assert_eq!(entry.field("scope"), Some("cmd:gc"));
        assert_eq!(entry.field("command"), Some("gc"));
        assert_eq!(entry.field("user"), event.user_id.as_deref());
        assert_eq!(entry.field("channel"), Some(event.channel_id.as_str()));
        assert_eq!(entry.field("channel_type"), Some("channel"));
        assert_eq!(entry.field("timestamp"), Some(event.ts.as_str()));
        assert_eq!(entry.field("retryable"), Some("false"));
        assert_eq!(entry.field("message"), Some("boom"));
        assert_eq!(bot.api.single_message().text, GENERIC_USER_MESSAGE);
    }

    #[tokio::test]
    async fn reply_failure_adds_a_second_error_and_does_not_escape() {
        let capture = LogCapture::default();
        let _guard = capture.install();
        let bot = TestBot::new();
        bot.api.fail_posts();
        let services = bot.services();
        let registry = bot.registry();
        let event = channel_event("");
        let args = Vec::new();
        let ctx = CommandContext {
            event: &event,
            command_name: "group",
            args: &args,
            services: &services,
            registry: &registry,
        };

        let error = BotError::validation("group name empty", "グループ名を入力してください");
        handle_command_error(error.into(), &ctx, Some("group")).await;

        let warnings = capture.events_at(Level::WARN);
        let errors = capture.events_at(Level::ERROR);
        assert_eq!(warnings.len(), 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field("message"), Some("Failed to send error message to user"));
        assert_eq!(errors[0].field("original_error"), Some("group name empty"));
    }
}
