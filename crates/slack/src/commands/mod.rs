//! Command contract and the handlers behind every registered command.
//!
//! Commands form a closed set. Each one describes itself (description, examples, optional
//! custom help) and executes against a [`CommandContext`]; a handler returns an error
//! instead of replying to it, so the centralized error handler decides what the user sees.

mod choice;
mod default;
mod dice;
mod group;
mod group_choice;
mod group_shuffle;
mod help;
mod reaction;
mod secret;
mod shuffle;

use std::sync::Arc;

use thiserror::Error;

use trrbot_core::errors::BotError;
use trrbot_core::random::Alphabet;
use trrbot_db::{GroupRepository, ReactionRepository, RepositoryError};

use crate::client::{ApiError, PostedMessage, SlackApi};
use crate::events::MessageEvent;
use crate::registry::CommandRegistry;

pub use dice::{DiceRoll, MAX_DICE_COUNT, MAX_DICE_FACES};
pub use secret::{DEFAULT_SECRET_LENGTH, MAX_SECRET_LENGTH};

pub const INVALID_NUMBER_MESSAGE: &str = "有効な正の整数を指定してください。";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    Help,
    Choice,
    GroupChoice,
    Reaction,
    Group,
    Dice,
    ZakoSecret,
    Secret,
    Shuffle,
    GroupShuffle,
    Default,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Choice => "choice",
            Self::GroupChoice => "groupChoice",
            Self::Reaction => "reaction",
            Self::Group => "group",
            Self::Dice => "dice",
            Self::ZakoSecret => "zako-secret",
            Self::Secret => "secret",
            Self::Shuffle => "shuffle",
            Self::GroupShuffle => "groupShuffle",
            Self::Default => "default",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Help => "このヘルプメッセージを表示します",
            Self::Choice => "指定された選択肢からランダムに1つ選びます",
            Self::GroupChoice => "指定されたグループからランダムに1つのアイテムを選びます",
            Self::Reaction => "リアクションマッピングを管理します",
            Self::Group => "グループを管理します",
            Self::Dice => "サイコロを振って、ランダムな数字を返します",
            Self::ZakoSecret => "指定された長さのランダムな英数字文字列を生成します",
            Self::Secret => "指定された長さのランダムな英数字と記号を含む文字列を生成します",
            Self::Shuffle => "指定された項目をランダムに並び替えて順序付けて返します",
            Self::GroupShuffle => {
                "指定されたグループ内のアイテムをランダムに並び替えて順序付けて返します"
            }
            Self::Default => {
                "未知のコマンドが入力された場合、入力されたテキスト全体を選択肢として扱います"
            }
        }
    }

    /// Usage lines for the help listing. `mention` is the bot's handle, `name` the
    /// name the command is listed under.
    pub fn examples(&self, mention: &str, name: &str) -> Vec<String> {
        let m = mention;
        match self {
            Self::Help => vec![format!("{m} {name}")],
            Self::Choice => vec![format!("{m} {name} ラーメン カレー 寿司")],
            Self::GroupChoice => vec![format!("{m} {name} 食べ物")],
            Self::Reaction => vec![
                format!("{m} {name} add おはよう :sunny:"),
                format!("{m} {name} list"),
            ],
            Self::Group => vec![
                format!("{m} {name} create 食べ物"),
                format!("{m} {name} add 食べ物 ラーメン カレー"),
            ],
            Self::Dice => vec![
                format!("{m} {name}"),
                format!("{m} {name} 10"),
                format!("{m} 2d6"),
                format!("{m} 3d10"),
            ],
            Self::ZakoSecret | Self::Secret => {
                vec![format!("{m} {name}"), format!("{m} {name} 20")]
            }
            Self::Shuffle => vec![format!("{m} {name} A B C D")],
            Self::GroupShuffle => vec![format!("{m} {name} グループ名")],
            Self::Default => vec![format!("{m} ラーメン カレー 寿司")],
        }
    }

    /// Replaces the standard help entry for commands with sub-commands.
    pub fn help_text(&self, mention: &str, name: &str) -> Option<String> {
        match self {
            Self::Group => Some(group::help_text(mention, name)),
            Self::Reaction => Some(reaction::help_text(mention, name)),
            _ => None,
        }
    }

    pub async fn execute(&self, ctx: &CommandContext<'_>) -> Result<(), CommandError> {
        match self {
            Self::Help => help::execute(ctx).await,
            Self::Choice => choice::execute(ctx).await,
            Self::GroupChoice => group_choice::execute(ctx).await,
            Self::Reaction => reaction::execute(ctx).await,
            Self::Group => group::execute(ctx).await,
            Self::Dice => dice::execute(ctx).await,
            Self::ZakoSecret => secret::execute(ctx, Alphabet::Alphanumeric).await,
            Self::Secret => secret::execute(ctx, Alphabet::AlphanumericWithSymbols).await,
            Self::Shuffle => shuffle::execute(ctx).await,
            Self::GroupShuffle => group_shuffle::execute(ctx).await,
            Self::Default => default::execute(ctx).await,
        }
    }
}

/// Anything a command handler can fail with.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Bot(#[from] BotError),
    /// `error_type` is the concrete type name when the failure was wrapped through
    /// [`CommandError::unexpected`].
    #[error("{error}")]
    Unexpected { error: anyhow::Error, error_type: Option<&'static str> },
    /// A failure that carries nothing but a description.
    #[error("{0}")]
    Raw(String),
}

impl CommandError {
    pub fn unexpected<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Unexpected { error: error.into(), error_type: Some(std::any::type_name::<E>()) }
    }
}

impl From<anyhow::Error> for CommandError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unexpected { error, error_type: None }
    }
}

impl From<RepositoryError> for CommandError {
    fn from(error: RepositoryError) -> Self {
        Self::Bot(error.into())
    }
}

impl From<ApiError> for CommandError {
    fn from(error: ApiError) -> Self {
        Self::Bot(error.into())
    }
}

/// Collaborators every command can reach.
#[derive(Clone)]
pub struct CommandServices {
    pub api: Arc<dyn SlackApi>,
    pub groups: Arc<dyn GroupRepository>,
    pub reactions: Arc<dyn ReactionRepository>,
    pub mention_name: String,
}

pub struct CommandContext<'a> {
    pub event: &'a MessageEvent,
    /// The command token as the user typed it.
    pub command_name: &'a str,
    pub args: &'a [String],
    pub services: &'a CommandServices,
    pub registry: &'a CommandRegistry,
}

impl CommandContext<'_> {
    /// Replies in the event's thread if it has one, otherwise at channel level.
    pub async fn say(&self, text: &str) -> Result<PostedMessage, ApiError> {
        self.services.api.post_message(&self.event.channel_id, text, self.event.thread_ts()).await
    }

    /// Replies in a thread, starting one under the event when needed.
    pub async fn say_threaded(&self, text: &str) -> Result<PostedMessage, ApiError> {
        self.services
            .api
            .post_message(&self.event.channel_id, text, Some(self.event.thread_or_ts()))
            .await
    }

    pub fn mention(&self) -> &str {
        &self.services.mention_name
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }
}

/// `1. a\n2. b`, one line per entry.
pub(crate) fn numbered_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| format!("{}. {}", index + 1, item.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}
