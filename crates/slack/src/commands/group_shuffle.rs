use trrbot_core::random::shuffle;

use super::{numbered_list, CommandContext, CommandError};

pub(super) async fn execute(ctx: &CommandContext<'_>) -> Result<(), CommandError> {
    let Some(name) = ctx.arg(0) else {
        ctx.say(&format!("グループ名を指定してください。\n例: `{} gs グループ名`", ctx.mention())).await?;
        return Ok(());
    };

    let items: Vec<String> = ctx
        .services
        .groups
        .items_by_group_name(name)
        .await?
        .into_iter()
        .map(|item| item.item_text)
        .collect();

    let text = match items.as_slice() {
        [] => format!("グループ \"{name}\" は存在しないか、アイテムがありません。"),
        [only] => format!("グループ \"{name}\" にはアイテムが1つしかありません: *{only}*"),
        _ => format!("グループ \"{name}\" のシャッフル結果:\n{}", numbered_list(&shuffle(&items))),
    };
    ctx.say(&text).await?;
    Ok(())
}
