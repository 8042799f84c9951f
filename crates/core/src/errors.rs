use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use thiserror::Error;

pub const DATABASE_USER_MESSAGE: &str =
    "データベース操作中にエラーが発生しました。しばらく待ってから再試行してください。";
pub const SLACK_API_USER_MESSAGE: &str =
    "Slack APIとの通信中にエラーが発生しました。しばらく待ってから再試行してください。";
pub const GENERIC_USER_MESSAGE: &str = "エラーが発生しました。";

/// Log level an error is reported at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BotErrorKind {
    Validation,
    Database,
    SlackApi,
    Generic,
}

impl BotErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Validation => "ValidationError",
            Self::Database => "DatabaseError",
            Self::SlackApi => "SlackAPIError",
            Self::Generic => "BotError",
        }
    }
}

pub type ErrorContext = BTreeMap<String, Value>;

/// Failure raised by bot code.
///
/// Carries two messages: `internal_message` goes to the logs, `user_message` is the
/// only text ever shown in the channel. Retryability and severity are fixed by the
/// constructor of each kind.
#[derive(Clone, Debug, PartialEq, Error)]
#[error("{}: {internal_message}", kind.name())]
pub struct BotError {
    kind: BotErrorKind,
    internal_message: String,
    user_message: String,
    context: ErrorContext,
    retryable: bool,
    severity: Severity,
}

impl BotError {
    /// User-caused failure. Never retryable, reported at warn.
    pub fn validation(
        internal_message: impl Into<String>,
        user_message: impl Into<String>,
    ) -> Self {
        Self {
            kind: BotErrorKind::Validation,
            internal_message: internal_message.into(),
            user_message: user_message.into(),
            context: ErrorContext::new(),
            retryable: false,
            severity: Severity::Warn,
        }
    }

    pub fn database(internal_message: impl Into<String>) -> Self {
        Self {
            kind: BotErrorKind::Database,
            internal_message: internal_message.into(),
            user_message: DATABASE_USER_MESSAGE.to_owned(),
            context: ErrorContext::new(),
            retryable: true,
            severity: Severity::Error,
        }
    }

    pub fn slack_api(internal_message: impl Into<String>) -> Self {
        Self {
            kind: BotErrorKind::SlackApi,
            internal_message: internal_message.into(),
            user_message: SLACK_API_USER_MESSAGE.to_owned(),
            context: ErrorContext::new(),
            retryable: true,
            severity: Severity::Error,
        }
    }

    pub fn generic(
        internal_message: impl Into<String>,
        user_message: impl Into<String>,
        retryable: bool,
        severity: Severity,
    ) -> Self {
        Self {
            kind: BotErrorKind::Generic,
            internal_message: internal_message.into(),
            user_message: user_message.into(),
            context: ErrorContext::new(),
            retryable,
            severity,
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> BotErrorKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn internal_message(&self) -> &str {
        &self.internal_message
    }

    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    pub fn context(&self) -> &ErrorContext {
        &self.context
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
