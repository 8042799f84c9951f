//! Constraints on user-supplied names and texts.
//!
//! Every validator trims the input, then rejects it when it is empty, longer than the
//! kind-specific limit (counted in characters), or contains a control character other
//! than tab, newline or carriage return. Content is otherwise left untouched.

use crate::errors::BotError;

pub const TRIGGER_TEXT_MAX_LENGTH: usize = 100;
pub const GROUP_NAME_MAX_LENGTH: usize = 50;
pub const ITEM_TEXT_MAX_LENGTH: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextKind {
    TriggerText,
    GroupName,
    ItemText,
}

impl TextKind {
    pub fn max_length(&self) -> usize {
        match self {
            Self::TriggerText => TRIGGER_TEXT_MAX_LENGTH,
            Self::GroupName => GROUP_NAME_MAX_LENGTH,
            Self::ItemText => ITEM_TEXT_MAX_LENGTH,
        }
    }

    fn field(&self) -> &'static str {
        match self {
            Self::TriggerText => "trigger_text",
            Self::GroupName => "group_name",
            Self::ItemText => "item_text",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::TriggerText => "トリガーテキスト",
            Self::GroupName => "グループ名",
            Self::ItemText => "アイテムテキスト",
        }
    }
}

pub fn validate_trigger_text(raw: &str) -> Result<String, BotError> {
    validate(TextKind::TriggerText, raw)
}

pub fn validate_group_name(raw: &str) -> Result<String, BotError> {
    validate(TextKind::GroupName, raw)
}

pub fn validate_item_text(raw: &str) -> Result<String, BotError> {
    validate(TextKind::ItemText, raw)
}

pub fn validate(kind: TextKind, raw: &str) -> Result<String, BotError> {
    let trimmed = raw.trim();
    let label = kind.label();

    if trimmed.is_empty() {
        return Err(BotError::validation(
            format!("{} is empty", kind.field()),
            format!("{label}を入力してください"),
        )
        .with_context("field", kind.field()));
    }

    let length = trimmed.chars().count();
    let max_length = kind.max_length();
    if length > max_length {
        return Err(BotError::validation(
            format!("{} exceeds {max_length} characters ({length})", kind.field()),
            format!("{label}は{max_length}文字以内で入力してください"),
        )
        .with_context("field", kind.field())
        .with_context("length", length)
        .with_context("max_length", max_length));
    }

    if trimmed.chars().any(is_forbidden_control) {
        return Err(BotError::validation(
            format!("{} contains a forbidden control character", kind.field()),
            format!("{label}に不正な制御文字が含まれています"),
        )
        .with_context("field", kind.field()));
    }

    Ok(trimmed.to_owned())
}

fn is_forbidden_control(ch: char) -> bool {
    matches!(
        ch,
        '\u{00}'..='\u{08}' | '\u{0B}' | '\u{0C}' | '\u{0E}'..='\u{1F}' | '\u{7F}'..='\u{9F}'
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{validate_group_name, validate_item_text, validate_trigger_text};
    use crate::errors::BotErrorKind;

    #[test]
    fn group_name_at_limit_is_accepted() {
        let name = "a".repeat(50);
        assert_eq!(validate_group_name(&name).expect("50 chars is legal"), name);
    }

    #[test]
    fn group_name_over_limit_is_rejected_with_lengths() {
        let error = validate_group_name(&"a".repeat(51)).expect_err("51 chars is too long");

        assert_eq!(error.kind(), BotErrorKind::Validation);
        assert_eq!(error.context().get("length"), Some(&json!(51)));
        assert_eq!(error.context().get("max_length"), Some(&json!(50)));
    }

    #[test]
    fn control_characters_are_rejected() {
        let error = validate_group_name("\x01bad").expect_err("control char");
        assert_eq!(error.kind(), BotErrorKind::Validation);
        assert!(validate_item_text("bad\x7f").is_err());
        assert!(validate_trigger_text("bad\u{85}").is_err());
    }

    #[test]
    fn tab_and_newline_are_allowed_inside_text() {
        assert_eq!(validate_group_name("a\tb").expect("tab is fine"), "a\tb");
        assert_eq!(validate_group_name("a\nb\r\nc").expect("newline is fine"), "a\nb\r\nc");
    }

    #[test]
    fn surrounding_whitespace_is_trimmed_before_measuring() {
        let padded = format!("   {}   ", "a".repeat(50));
        assert_eq!(validate_group_name(&padded).expect("trimmed length is 50"), "a".repeat(50));
    }

    #[test]
    fn empty_or_blank_input_is_rejected() {
        assert!(validate_group_name("").is_err());
        assert!(validate_trigger_text("   ").is_err());
        assert!(validate_item_text("\n\t").is_err());
    }

    #[test]
    fn limits_differ_per_kind() {
        assert!(validate_trigger_text(&"x".repeat(100)).is_ok());
        assert!(validate_trigger_text(&"x".repeat(101)).is_err());
        assert!(validate_item_text(&"x".repeat(200)).is_ok());
        assert!(validate_item_text(&"x".repeat(201)).is_err());
    }

    #[test]
    fn length_is_counted_in_characters() {
        let name = "あ".repeat(50);
        assert_eq!(validate_group_name(&name).expect("multibyte chars count once"), name);
    }

    #[test]
    fn content_is_not_case_folded() {
        assert_eq!(validate_group_name(" Lunch ").expect("valid"), "Lunch");
    }
}
