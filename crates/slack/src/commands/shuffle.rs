use trrbot_core::random::shuffle;

use super::{numbered_list, CommandContext, CommandError};

pub(super) async fn execute(ctx: &CommandContext<'_>) -> Result<(), CommandError> {
    if ctx.args.len() < 2 {
        let text = format!(
            "並び替える項目を2つ以上指定してください。\n例: `{} shuffle A B C D`",
            ctx.mention()
        );
        ctx.say(&text).await?;
        return Ok(());
    }

    let shuffled = shuffle(ctx.args);
    ctx.say(&format!("シャッフル結果:\n{}", numbered_list(&shuffled))).await?;
    Ok(())
}
