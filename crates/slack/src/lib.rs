//! Slack side of trrbot.
//!
//! - **Client** (`client`) - the Web API calls the bot makes
//! - **Commands** (`commands`, `registry`, `dispatch`) - free text to one command execution
//! - **Errors** (`error_handler`) - one log entry and one reply per failed command
//! - **Events** (`events`, `reactions`) - mention and message handling, auto reactions
//! - **Socket Mode** (`socket`) - websocket event loop with reconnection
//!
//! ```text
//! Socket Mode → EventDispatcher → Mention/Message handler → CommandDispatcher → Command
//!                                        ↓                                        ↓
//!                                 AutoReactionService                    error_handler
//! ```

pub mod client;
pub mod commands;
pub mod dispatch;
pub mod error_handler;
pub mod events;
pub mod reactions;
pub mod registry;
pub mod socket;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{ApiError, FileUpload, PostedMessage, SlackApi, WebApiClient};
pub use commands::{Command, CommandContext, CommandError, CommandServices};
pub use dispatch::{CommandDispatcher, DispatchOutcome};
pub use events::{bot_dispatcher, EventDispatcher, MessageEvent};
pub use reactions::AutoReactionService;
pub use registry::{default_registry, CommandRegistration, CommandRegistry, RegistryError};
pub use socket::{ReconnectPolicy, SocketModeRunner, SocketTransport, WebSocketTransport};
