//! Telegram side of the dispatcher's collaborators: sending replies and
//! downloading photos.

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::FileId;
use tracing::debug;

use super::ui_builder::{split_message, TELEGRAM_MESSAGE_LIMIT};

/// Reply channel back to a chat
#[async_trait]
pub trait Responder: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()>;
}

/// Source of photo bytes for a Telegram file id
#[async_trait]
pub trait PhotoSource: Send + Sync {
    async fn fetch(&self, file_id: &str) -> Result<Vec<u8>>;
}

/// Both collaborators backed by the Bot API
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
    http_client: reqwest::Client,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self {
            bot,
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Responder for TelegramTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        let parts = split_message(text, TELEGRAM_MESSAGE_LIMIT);
        if parts.len() > 1 {
            debug!(user_id = %chat_id, parts = parts.len(), "Splitting long reply");
        }

        for part in parts {
            self.bot.send_message(chat_id, part).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl PhotoSource for TelegramTransport {
    async fn fetch(&self, file_id: &str) -> Result<Vec<u8>> {
        let file = self
            .bot
            .get_file(FileId(file_id.to_string()))
            .await
            .context("Failed to resolve photo file")?;
        let url = format!(
            "https://api.telegram.org/file/bot{}/{}",
            self.bot.token(),
            file.path
        );

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            // The URL embeds the bot token, keep it out of the error chain
            .map_err(|e| anyhow::anyhow!("Failed to download photo: {}", e.without_url()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read photo body: {}", e.without_url()))?;

        debug!(size = bytes.len(), "Photo downloaded");
        Ok(bytes.to_vec())
    }
}
