use trrbot_core::random::random_int;

use super::{CommandContext, CommandError, INVALID_NUMBER_MESSAGE};
use crate::registry::parse_dice_code;

pub const MAX_DICE_COUNT: i64 = 100;
pub const MAX_DICE_FACES: i64 = 1_000_000;
const DEFAULT_FACES: i64 = 6;

/// `count` dice with `faces` faces each, both already range-checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiceRoll {
    count: i64,
    faces: i64,
}

impl DiceRoll {
    /// `None` when either side is zero, over its cap, or does not fit an integer.
    pub fn new(count: &str, faces: &str) -> Option<Self> {
        let count: i64 = count.parse().ok()?;
        let faces: i64 = faces.parse().ok()?;
        let in_range =
            (1..=MAX_DICE_COUNT).contains(&count) && (1..=MAX_DICE_FACES).contains(&faces);
        in_range.then_some(Self { count, faces })
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    pub fn faces(&self) -> i64 {
        self.faces
    }

    pub fn roll(&self) -> Vec<i64> {
        (0..self.count).map(|_| random_int(1, self.faces)).collect()
    }
}

pub(super) async fn execute(ctx: &CommandContext<'_>) -> Result<(), CommandError> {
    // `2d6` arrives as the command token, `dice 2d6` as the first argument.
    let code = std::iter::once(ctx.command_name).chain(ctx.arg(0)).find_map(parse_dice_code);

    if let Some((count, faces)) = code {
        let Some(dice) = DiceRoll::new(count, faces) else {
            let text = format!(
                "ダイスの数は1〜{MAX_DICE_COUNT}、面数は1〜{MAX_DICE_FACES}の範囲で指定してください。"
            );
            ctx.say(&text).await?;
            return Ok(());
        };

        let values = dice.roll();
        let total: i64 = values.iter().sum();
        let joined = values.iter().map(i64::to_string).collect::<Vec<_>>().join(", ");
        let text = format!("🎲 {}d{} の結果: {joined} = *{total}*", dice.count, dice.faces);
        ctx.say(&text).await?;
        return Ok(());
    }

    let faces = match ctx.arg(0) {
        None => DEFAULT_FACES,
        Some(raw) => match raw.parse::<i64>() {
            Ok(faces) if faces > 0 => faces,
            _ => {
                ctx.say(INVALID_NUMBER_MESSAGE).await?;
                return Ok(());
            }
        },
    };

    ctx.say(&format!("🎲 結果: *{}*", random_int(1, faces))).await?;
    Ok(())
}
