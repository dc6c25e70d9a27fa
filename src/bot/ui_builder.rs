//! UI Builder module for reply texts, the command menu, and message splitting

use teloxide::types::BotCommand;

// Import localization
use crate::localization::{t, t_args};

use crate::classifier::Command;

/// Telegram's limit is 4096 characters, keep some margin
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4000;

/// Handler stage a failure happened in, selects the retry message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Image,
    Prompt,
    Response,
    Code,
}

impl FailureStage {
    fn message_key(self) -> &'static str {
        match self {
            FailureStage::Image => "error-image-failed",
            FailureStage::Prompt => "error-prompt-failed",
            FailureStage::Response => "error-response-failed",
            FailureStage::Code => "error-code-failed",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureStage::Image => "image",
            FailureStage::Prompt => "prompt",
            FailureStage::Response => "response",
            FailureStage::Code => "code",
        }
    }
}

/// Reply for `/start`
pub fn start_message(username: &str) -> String {
    t_args("start-greeting", &[("username", username)])
}

/// Reply for `/help`
pub fn help_message(bot_username: &str) -> String {
    t_args("help-text", &[("bot_username", bot_username)])
}

/// Replies for `/image`, sent as separate messages
pub fn image_instructions() -> Vec<String> {
    vec![t("image-intro"), t("image-instructions")]
}

/// Canned answer to a greeting
pub fn greeting_reply(bot_username: &str) -> String {
    t_args("greeting-reply", &[("bot_username", bot_username)])
}

/// Generic retry suggestion shown when processing failed
pub fn processing_failed_message(stage: FailureStage) -> String {
    t(stage.message_key())
}

/// Command menu registered with Telegram at startup
pub fn bot_commands() -> Vec<BotCommand> {
    Command::MENU
        .iter()
        .map(|(name, description_key)| BotCommand::new(*name, t(description_key)))
        .collect()
}

/// Split a reply into parts of at most `max_chars` characters.
///
/// Cuts at the last newline inside the limit when there is one, otherwise
/// mid-line. Whitespace-only parts are dropped since Telegram rejects them.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut parts = Vec::new();
    let mut rest = text;

    while rest.chars().count() > max_chars {
        let limit = rest
            .char_indices()
            .nth(max_chars)
            .map(|(index, _)| index)
            .unwrap_or(rest.len());

        let cut = match rest[..limit].rfind('\n') {
            Some(index) if index > 0 => index,
            _ => limit,
        };

        parts.push(rest[..cut].to_string());
        let tail = &rest[cut..];
        rest = tail.strip_prefix('\n').unwrap_or(tail);
    }
    parts.push(rest.to_string());

    parts.retain(|part| !part.trim().is_empty());
    parts
}
