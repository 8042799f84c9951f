use trrbot_core::random::random_item;

use super::{CommandContext, CommandError};

pub(super) async fn execute(ctx: &CommandContext<'_>) -> Result<(), CommandError> {
    let Some(name) = ctx.arg(0) else {
        ctx.say("グループ名を指定してください。").await?;
        return Ok(());
    };

    let items = ctx.services.groups.items_by_group_name(name).await?;
    let text = match random_item(&items) {
        Some(item) => format!("選ばれたのは: *{}*", item.item_text),
        None => format!("グループ \"{name}\" は存在しないか、アイテムがありません。"),
    };
    ctx.say(&text).await?;
    Ok(())
}
