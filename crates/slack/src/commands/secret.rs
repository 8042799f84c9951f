use trrbot_core::random::{random_string, Alphabet};

use super::{CommandContext, CommandError, INVALID_NUMBER_MESSAGE};

pub const DEFAULT_SECRET_LENGTH: usize = 10;
pub const MAX_SECRET_LENGTH: usize = 100;

pub(super) async fn execute(
    ctx: &CommandContext<'_>,
    alphabet: Alphabet,
) -> Result<(), CommandError> {
    let length = match ctx.arg(0) {
        None => DEFAULT_SECRET_LENGTH,
        Some(raw) => match requested_length(raw) {
            Some(length) => length,
            None => {
                ctx.say(INVALID_NUMBER_MESSAGE).await?;
                return Ok(());
            }
        },
    };

    let secret = random_string(length, alphabet);
    let text = match alphabet {
        Alphabet::AlphanumericWithSymbols => {
            format!("🔐 生成されたシークレット文字列（記号含む）: `{secret}`")
        }
        Alphabet::Alphanumeric => format!("🔑 生成されたシークレット文字列: `{secret}`"),
    };
    ctx.say(&text).await?;
    Ok(())
}

/// A positive decimal length, clamped to the maximum. Digits too large for `usize` clamp too.
fn requested_length(raw: &str) -> Option<usize> {
    if raw.is_empty() || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    match raw.parse::<usize>() {
        Ok(0) => None,
        Ok(length) => Some(length.min(MAX_SECRET_LENGTH)),
        Err(_) => Some(MAX_SECRET_LENGTH),
    }
}
