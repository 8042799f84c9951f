use trrbot_core::random::random_item;

use super::{CommandContext, CommandError};

/// Unknown command: the whole input, command token included, is the candidate list.
pub(super) async fn execute(ctx: &CommandContext<'_>) -> Result<(), CommandError> {
    let candidates: Vec<&str> = std::iter::once(ctx.command_name)
        .chain(ctx.args.iter().map(String::as_str))
        .filter(|candidate| !candidate.is_empty())
        .collect();

    let text = match random_item(&candidates) {
        Some(picked) => format!("選ばれたのは: *{picked}*"),
        None => "'help'コマンドでヘルプを表示できます。".to_owned(),
    };
    ctx.say(&text).await?;
    Ok(())
}
