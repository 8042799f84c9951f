use std::collections::HashMap;

use thiserror::Error;
use tracing::warn;

use crate::commands::Command;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("command `{primary}` has an empty or whitespace-containing name `{name}`")]
    InvalidName { primary: String, name: String },
    #[error("command name `{name}` is claimed by both `{first}` and `{second}`")]
    DuplicateName { name: String, first: String, second: String },
}

/// Static binding of a command to the names it answers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandRegistration {
    primary_name: String,
    command: Command,
    aliases: Vec<String>,
    display_name: Option<String>,
    dm_only: bool,
}

impl CommandRegistration {
    pub fn new(primary_name: impl Into<String>, command: Command) -> Self {
        Self {
            primary_name: primary_name.into(),
            command,
            aliases: Vec::new(),
            display_name: None,
            dm_only: false,
        }
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn display_as(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn dm_only(mut self) -> Self {
        self.dm_only = true;
        self
    }

    pub fn primary_name(&self) -> &str {
        &self.primary_name
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn alias_names(&self) -> &[String] {
        &self.aliases
    }

    /// Name shown to users: the display override when set, else the primary name.
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.primary_name)
    }

    pub fn has_display_name(&self) -> bool {
        self.display_name.is_some()
    }

    pub fn is_dm_only(&self) -> bool {
        self.dm_only
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary_name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// Immutable after construction; shared by the dispatcher and the help command.
#[derive(Debug)]
pub struct CommandRegistry {
    registrations: Vec<CommandRegistration>,
    index: HashMap<String, usize>,
}

impl CommandRegistry {
    pub fn new(registrations: Vec<CommandRegistration>) -> Result<Self, RegistryError> {
        let mut index = HashMap::new();

        for (position, registration) in registrations.iter().enumerate() {
            for name in registration.names() {
                if name.is_empty() || name.chars().any(char::is_whitespace) {
                    return Err(RegistryError::InvalidName {
                        primary: registration.primary_name.clone(),
                        name: name.to_owned(),
                    });
                }

                let key = name.to_lowercase();
                if is_dice_code(&key) {
                    warn!(
                        event_name = "command.registry.alias_shadowed",
                        name,
                        command = registration.primary_name.as_str(),
                        "name matches dice notation and will always resolve to dice"
                    );
                }

                if let Some(&existing) = index.get(&key) {
                    let first: &CommandRegistration = &registrations[existing];
                    return Err(RegistryError::DuplicateName {
                        name: name.to_owned(),
                        first: first.primary_name.clone(),
                        second: registration.primary_name.clone(),
                    });
                }
                index.insert(key, position);
            }
        }

        Ok(Self { registrations, index })
    }

    /// Total: every token resolves to some command, `Default` when nothing matches.
    pub fn resolve(&self, token: &str) -> Command {
        let key = token.to_lowercase();
        if is_dice_code(&key) {
            return Command::Dice;
        }

        self.index
            .get(&key)
            .and_then(|&position| self.registrations.get(position))
            .map(CommandRegistration::command)
            .unwrap_or(Command::Default)
    }

    /// Registration behind a token, or `None` for dice codes and unknown names.
    pub fn resolve_registration(&self, token: &str) -> Option<&CommandRegistration> {
        let key = token.to_lowercase();
        if is_dice_code(&key) {
            return None;
        }

        self.index.get(&key).and_then(|&position| self.registrations.get(position))
    }

    pub fn registrations(&self) -> &[CommandRegistration] {
        &self.registrations
    }

    pub fn registration_for(&self, command: Command) -> Option<&CommandRegistration> {
        self.registrations.iter().find(|registration| registration.command == command)
    }
}

/// `NdM`: one or more digits, `d` or `D`, one or more digits.
pub fn is_dice_code(token: &str) -> bool {
    parse_dice_code(token).is_some()
}

/// Splits an `NdM` token into its digit runs without interpreting them.
pub fn parse_dice_code(token: &str) -> Option<(&str, &str)> {
    let split = token.find(['d', 'D'])?;
    let (count, faces) = (&token[..split], &token[split + 1..]);
    let all_digits =
        |part: &str| !part.is_empty() && part.bytes().all(|byte| byte.is_ascii_digit());
    (all_digits(count) && all_digits(faces)).then_some((count, faces))
}

pub fn default_registry() -> Result<CommandRegistry, RegistryError> {
    CommandRegistry::new(vec![
        CommandRegistration::new("help", Command::Help),
        CommandRegistration::new("choice", Command::Choice),
        CommandRegistration::new("groupChoice", Command::GroupChoice)
            .aliases(["gc", "group-choice", "gchoice"])
            .display_as("gc"),
        CommandRegistration::new("reaction", Command::Reaction),
        CommandRegistration::new("group", Command::Group),
        CommandRegistration::new("dice", Command::Dice),
        CommandRegistration::new("zako-secret", Command::ZakoSecret).dm_only(),
        CommandRegistration::new("secret", Command::Secret).dm_only(),
        CommandRegistration::new("shuffle", Command::Shuffle),
        CommandRegistration::new("groupShuffle", Command::GroupShuffle)
            .aliases(["gs", "group-shuffle", "gshuffle"])
            .display_as("gs"),
    ])
}
