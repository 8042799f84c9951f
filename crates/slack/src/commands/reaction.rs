use chrono::Utc;

use trrbot_core::domain::reaction::{reaction_name, ReactionMapping};
use trrbot_core::errors::BotError;
use trrbot_core::validation::validate_trigger_text;
use trrbot_db::RepositoryError;

use super::{CommandContext, CommandError};
use crate::client::FileUpload;

const SUB_COMMANDS: &str = "list, add, remove, export";
const CSV_HEADER: &str = "ID,トリガーテキスト,リアクション,使用回数,作成日時,更新日時";
const MISSING_ARGUMENTS: &str = "トリガーテキストとリアクションを指定してください。";

pub(super) fn help_text(mention: &str, name: &str) -> String {
    let m = mention;
    [
        format!("*{name}* - リアクションマッピングを管理します"),
        format!("  `{m} {name} add <トリガー> <:emoji:>` - トリガーを含むメッセージにリアクションを付けます"),
        format!("  `{m} {name} remove <トリガー> <:emoji:>` - マッピングを削除"),
        format!("  `{m} {name} list` - マッピングと使用回数を表示"),
        format!("  `{m} {name} export` - マッピングをCSVでエクスポート"),
    ]
    .join("\n")
        + "\n\n"
}

pub(super) async fn execute(ctx: &CommandContext<'_>) -> Result<(), CommandError> {
    let Some(sub_command) = ctx.arg(0) else {
        ctx.say_threaded(&format!("サブコマンドを指定してください（{SUB_COMMANDS}）。")).await?;
        return Ok(());
    };

    let sub_command = sub_command.to_lowercase();
    let text = match sub_command.as_str() {
        "add" => add(ctx).await?,
        "remove" => remove(ctx).await?,
        "list" => list(ctx).await?,
        "export" => match export(ctx).await? {
            Some(text) => text,
            None => return Ok(()),
        },
        unknown => format!("未知のサブコマンド: {unknown}\n有効なサブコマンド: {SUB_COMMANDS}"),
    };

    ctx.say_threaded(&text).await?;
    Ok(())
}

/// Trigger and reaction from `args[1]` and `args[2]`, the reaction as `:name:`.
fn mapping_arguments(ctx: &CommandContext<'_>) -> Result<Option<(String, String)>, BotError> {
    let (Some(trigger), Some(reaction)) = (ctx.arg(1), ctx.arg(2)) else {
        return Ok(None);
    };

    let trigger = validate_trigger_text(trigger)?;
    let name = reaction_name(reaction);
    if name.is_empty() {
        return Err(BotError::validation(
            format!("reaction `{reaction}` has no emoji name"),
            "リアクションを入力してください",
        ));
    }
    Ok(Some((trigger, format!(":{name}:"))))
}

async fn add(ctx: &CommandContext<'_>) -> Result<String, CommandError> {
    let Some((trigger, reaction)) = mapping_arguments(ctx)? else {
        return Ok(MISSING_ARGUMENTS.to_owned());
    };
    let reactions = &ctx.services.reactions;

    if reactions.find(&trigger, &reaction).await?.is_some() {
        return Err(duplicate_mapping(&trigger, &reaction).into());
    }

    match reactions.create(&trigger, &reaction).await {
        Ok(_) => Ok(format!("リアクションマッピングを追加しました: \"{trigger}\" → {reaction}")),
        Err(RepositoryError::Conflict(_)) => Err(duplicate_mapping(&trigger, &reaction).into()),
        Err(error) => Err(error.into()),
    }
}

fn duplicate_mapping(trigger: &str, reaction: &str) -> BotError {
    BotError::validation(
        format!("mapping `{trigger}` -> `{reaction}` already exists"),
        format!("リアクションマッピング \"{trigger}\" → {reaction} は既に存在します。"),
    )
    .with_context("trigger_text", trigger)
    .with_context("reaction", reaction)
}

async fn remove(ctx: &CommandContext<'_>) -> Result<String, CommandError> {
    let Some((trigger, reaction)) = mapping_arguments(ctx)? else {
        return Ok(MISSING_ARGUMENTS.to_owned());
    };

    if ctx.services.reactions.delete(&trigger, &reaction).await? {
        Ok(format!("リアクションマッピングを削除しました: \"{trigger}\" → {reaction}"))
    } else {
        Ok(format!("リアクションマッピング \"{trigger}\" → {reaction} は存在しません。"))
    }
}

async fn list(ctx: &CommandContext<'_>) -> Result<String, CommandError> {
    let mappings = ctx.services.reactions.list().await?;
    if mappings.is_empty() {
        return Ok("リアクションマッピングはありません。".to_owned());
    }

    let lines: Vec<String> = mappings
        .iter()
        .map(|mapping| {
            format!(
                "\"{}\" → {} (使用回数: {})",
                mapping.trigger_text, mapping.reaction, mapping.usage_count
            )
        })
        .collect();
    Ok(format!("*リアクションマッピング一覧:*\n{}", lines.join("\n")))
}

/// Uploads the CSV. Returns a reply only when there was nothing to export.
async fn export(ctx: &CommandContext<'_>) -> Result<Option<String>, CommandError> {
    let mappings = ctx.services.reactions.list().await?;
    if mappings.is_empty() {
        return Ok(Some("エクスポートするリアクションマッピングはありません。".to_owned()));
    }

    let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string();
    let upload = FileUpload {
        channel_id: ctx.event.channel_id.clone(),
        thread_ts: Some(ctx.event.thread_or_ts().to_owned()),
        filename: format!("reaction-mappings-{timestamp}.csv"),
        title: "リアクションマッピング一覧".to_owned(),
        initial_comment: Some("リアクションマッピングをCSVファイルとしてエクスポートしました。".to_owned()),
        content: mappings_csv(&mappings).into_bytes(),
    };
    ctx.services.api.upload_file(upload).await?;
    Ok(None)
}

pub(crate) fn mappings_csv(mappings: &[ReactionMapping]) -> String {
    let rows = mappings.iter().map(|mapping| {
        format!(
            "{},\"{}\",{},{},{},{}",
            mapping.id.0,
            mapping.trigger_text.replace('"', "\"\""),
            mapping.reaction,
            mapping.usage_count,
            mapping.created_at.to_rfc3339(),
            mapping.updated_at.to_rfc3339(),
        )
    });
    std::iter::once(CSV_HEADER.to_owned()).chain(rows).collect::<Vec<_>>().join("\n")
}
