use super::{Command, CommandContext, CommandError};
use crate::registry::{CommandRegistration, CommandRegistry};

const HEADER: &str =
    "\n*使用可能なコマンド:*\n_ヒント: DMではメンション不要でコマンドを実行できます_\n\n";

pub(super) async fn execute(ctx: &CommandContext<'_>) -> Result<(), CommandError> {
    let text = render(ctx.registry, ctx.mention());
    ctx.say(&text).await?;
    Ok(())
}

/// Help listing for every registration, in registration order.
pub fn render(registry: &CommandRegistry, mention: &str) -> String {
    let mut text = HEADER.to_owned();
    for registration in registry.registrations() {
        text.push_str(&entry(registration, mention));
    }
    text
}

fn entry(registration: &CommandRegistration, mention: &str) -> String {
    let command = registration.command();
    let display_name = registration.display_name();
    if let Some(custom) = command.help_text(mention, display_name) {
        return custom;
    }

    let mut text = format!("{} - {}\n", name_display(registration), command.description());

    let examples = command.examples(mention, display_name);
    if let Some(first) = examples.first() {
        text.push_str(&format!("  例: `{first}`"));
        // Dice also shows its bare `NdM` form.
        if command == Command::Dice {
            if let Some(shorthand) = examples.get(2) {
                text.push_str(&format!(", `{shorthand}`"));
            }
        }
        text.push('\n');
    }

    text.push('\n');
    text
}

fn name_display(registration: &CommandRegistration) -> String {
    let display_name = registration.display_name();
    if registration.is_dm_only() {
        return format!("*{display_name} (DM専用)*");
    }

    if registration.has_display_name() && !registration.alias_names().is_empty() {
        let others: Vec<&str> = std::iter::once(registration.primary_name())
            .chain(registration.alias_names().iter().map(String::as_str))
            .filter(|name| *name != display_name)
            .collect();
        return format!("*{display_name} ({})*", others.join(", "));
    }

    format!("*{display_name}*")
}
