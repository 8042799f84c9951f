use trrbot_core::random::random_item;

use super::{CommandContext, CommandError};

pub(super) async fn execute(ctx: &CommandContext<'_>) -> Result<(), CommandError> {
    let Some(picked) = random_item(ctx.args) else {
        ctx.say("選択肢を指定してください。").await?;
        return Ok(());
    };

    ctx.say(&format!("選ばれたのは: *{picked}*")).await?;
    Ok(())
}
