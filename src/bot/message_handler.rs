//! Message Handler module: teloxide endpoint feeding the dispatcher

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::PhotoSize;
use tracing::debug;

use crate::classifier::PhotoVariant;
use crate::dialogue::{ConversationDialogue, ConversationStorage};

use super::dispatcher::{ChatDispatcher, Inbound};

/// Name used for a message's author: username, else first name, else chat id
pub fn display_user(msg: &Message) -> String {
    msg.chat
        .username()
        .map(str::to_string)
        .or_else(|| msg.from.as_ref().and_then(|user| user.username.clone()))
        .or_else(|| msg.from.as_ref().map(|user| user.first_name.clone()))
        .unwrap_or_else(|| msg.chat.id.to_string())
}

fn photo_variant(photo: &PhotoSize) -> PhotoVariant {
    PhotoVariant {
        file_id: photo.file.id.0.clone(),
        width: photo.width,
        height: photo.height,
        file_size: photo.file.size,
    }
}

/// Convert a Telegram message into the dispatcher's input
pub fn inbound_from_message(msg: &Message) -> Inbound {
    Inbound {
        chat_id: msg.chat.id,
        sender: msg.from.as_ref().map(|user| user.id),
        user: display_user(msg),
        text: msg.text().map(str::to_string),
        photos: msg
            .photo()
            .map(|photos| photos.iter().map(photo_variant).collect())
            .unwrap_or_default(),
    }
}

/// Enter the sender's dialogue, keyed by user so group members stay apart
pub fn enter_conversation(
    msg: Message,
    storage: Arc<ConversationStorage>,
) -> ConversationDialogue {
    inbound_from_message(&msg).dialogue(storage)
}

pub async fn message_handler(
    msg: Message,
    dialogue: ConversationDialogue,
    dispatcher: Arc<ChatDispatcher>,
) -> Result<()> {
    debug!(
        user_id = %msg.chat.id,
        chat_kind = if msg.chat.is_private() { "private" } else { "group" },
        "Received message"
    );

    dispatcher.handle(inbound_from_message(&msg), dialogue).await;
    Ok(())
}
