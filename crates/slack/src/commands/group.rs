use trrbot_core::errors::BotError;
use trrbot_core::validation::{validate_group_name, validate_item_text};
use trrbot_db::RepositoryError;

use super::{CommandContext, CommandError};

const SUB_COMMANDS: &str = "list, create, delete, items, add, remove, clear";

pub(super) fn help_text(mention: &str, name: &str) -> String {
    let m = mention;
    [
        format!("*{name}* - グループを管理します"),
        format!("  `{m} {name} list` - グループ一覧を表示"),
        format!("  `{m} {name} create <グループ名>` - グループを作成"),
        format!("  `{m} {name} delete <グループ名>` - グループを削除"),
        format!("  `{m} {name} items <グループ名>` - アイテム一覧を表示"),
        format!("  `{m} {name} add <グループ名> <アイテム...>` - アイテムを追加（複数可）"),
        format!("  `{m} {name} remove <グループ名> <アイテム>` - アイテムを削除"),
        format!("  `{m} {name} clear <グループ名>` - すべてのアイテムを削除"),
    ]
    .join("\n")
        + "\n\n"
}

pub(super) async fn execute(ctx: &CommandContext<'_>) -> Result<(), CommandError> {
    let Some(sub_command) = ctx.arg(0) else {
        let text = format!("サブコマンドを指定してください（{SUB_COMMANDS}）。");
        ctx.say_threaded(&text).await?;
        return Ok(());
    };

    let sub_command = sub_command.to_lowercase();
    let text = match sub_command.as_str() {
        "list" => list(ctx).await?,
        "create" => create(ctx).await?,
        "delete" => delete(ctx).await?,
        "items" => items(ctx).await?,
        "add" => add(ctx).await?,
        "remove" => remove(ctx).await?,
        "clear" => clear(ctx).await?,
        unknown => format!("未知のサブコマンド: {unknown}\n有効なサブコマンド: {SUB_COMMANDS}"),
    };

    ctx.say_threaded(&text).await?;
    Ok(())
}

fn group_name(ctx: &CommandContext<'_>) -> Result<String, BotError> {
    validate_group_name(ctx.arg(1).unwrap_or_default())
}

async fn list(ctx: &CommandContext<'_>) -> Result<String, CommandError> {
    let groups = ctx.services.groups.list().await?;
    if groups.is_empty() {
        return Ok("グループはありません。".to_owned());
    }

    let names: Vec<&str> = groups.iter().map(|group| group.name.as_str()).collect();
    Ok(format!("*グループ一覧:*\n{}", names.join("\n")))
}

async fn create(ctx: &CommandContext<'_>) -> Result<String, CommandError> {
    let name = group_name(ctx)?;
    let groups = &ctx.services.groups;

    if groups.find_by_name(&name).await?.is_some() {
        return Err(duplicate_group(&name).into());
    }

    match groups.create(&name).await {
        Ok(_) => Ok(format!("グループ \"{name}\" を作成しました。")),
        // Lost a race with a concurrent create of the same name.
        Err(RepositoryError::Conflict(_)) => Err(duplicate_group(&name).into()),
        Err(error) => Err(error.into()),
    }
}

fn duplicate_group(name: &str) -> BotError {
    BotError::validation(
        format!("group `{name}` already exists"),
        format!("グループ名 \"{name}\" は既に存在します。"),
    )
    .with_context("group_name", name)
}

async fn delete(ctx: &CommandContext<'_>) -> Result<String, CommandError> {
    let name = group_name(ctx)?;
    if ctx.services.groups.delete_by_name(&name).await? {
        Ok(format!("グループ \"{name}\" を削除しました。"))
    } else {
        Ok(format!("グループ \"{name}\" は存在しません。"))
    }
}

async fn items(ctx: &CommandContext<'_>) -> Result<String, CommandError> {
    let name = group_name(ctx)?;
    let items = ctx.services.groups.items_by_group_name(&name).await?;
    if items.is_empty() {
        return Ok(format!("グループ \"{name}\" にはアイテムがありません。"));
    }

    let texts: Vec<&str> = items.iter().map(|item| item.item_text.as_str()).collect();
    Ok(format!("*グループ \"{name}\" のアイテム:*\n{}", texts.join("\n")))
}

async fn add(ctx: &CommandContext<'_>) -> Result<String, CommandError> {
    let name = group_name(ctx)?;
    let raw_items = ctx.args.get(2..).unwrap_or_default();
    if raw_items.is_empty() {
        return Err(BotError::validation(
            format!("no items given for group `{name}`"),
            "追加するアイテムを指定してください。",
        )
        .into());
    }

    let items = raw_items
        .iter()
        .map(|item| validate_item_text(item))
        .collect::<Result<Vec<_>, _>>()?;

    let Some(added) = ctx.services.groups.add_items(&name, &items).await? else {
        return Ok(format!("グループ \"{name}\" は存在しません。"));
    };

    match added.as_slice() {
        [single] => Ok(format!("グループ \"{name}\" にアイテム \"{}\" を追加しました。", single.item_text)),
        _ => Ok(format!(
            "グループ \"{name}\" に {} 個のアイテムを追加しました：\n{}",
            items.len(),
            items.join("\n")
        )),
    }
}

async fn remove(ctx: &CommandContext<'_>) -> Result<String, CommandError> {
    let name = group_name(ctx)?;
    let item = validate_item_text(&ctx.args.get(2..).unwrap_or_default().join(" "))?;

    if ctx.services.groups.remove_item(&name, &item).await? {
        Ok(format!("グループ \"{name}\" からアイテム \"{item}\" を削除しました。"))
    } else {
        Ok(format!("グループ \"{name}\" またはアイテム \"{item}\" は存在しません。"))
    }
}

async fn clear(ctx: &CommandContext<'_>) -> Result<String, CommandError> {
    let name = group_name(ctx)?;
    match ctx.services.groups.clear_items(&name).await? {
        Some(_) => Ok(format!("グループ \"{name}\" のすべてのアイテムを削除しました。")),
        None => Ok(format!("グループ \"{name}\" は存在しません。")),
    }
}
