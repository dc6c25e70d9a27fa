//! Conversation state for the image-then-prompt exchange.

use image::{DynamicImage, ImageFormat, ImageOutputFormat};
use std::io::Cursor;
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};
use teloxide::types::{ChatId, UserId};

use crate::errors::ProcessingError;

/// Prefix a text message must start with to be used as an image prompt
pub const PROMPT_MARKER: &str = "Image:";

/// Sequencer state of one conversation
#[derive(Clone, Debug, Default)]
pub enum ConversationState {
    #[default]
    Idle,
    /// A photo sent in `chat_id` waits for its `Image:` prompt
    AwaitingPrompt { chat_id: ChatId, image: PendingImage },
}

impl ConversationState {
    /// Whether text sent in `chat_id` belongs to the pending image
    pub fn is_awaiting_in(&self, chat_id: ChatId) -> bool {
        matches!(
            self,
            ConversationState::AwaitingPrompt { chat_id: origin, .. } if *origin == chat_id
        )
    }

    pub fn pending_image(&self) -> Option<&PendingImage> {
        match self {
            ConversationState::Idle => None,
            ConversationState::AwaitingPrompt { image, .. } => Some(image),
        }
    }
}

/// In-memory storage shared by all conversations
pub type ConversationStorage = InMemStorage<ConversationState>;

/// Type alias for a single sender's conversation
pub type ConversationDialogue = Dialogue<ConversationState, ConversationStorage>;

/// Storage slot of a conversation.
///
/// Conversations belong to the sender, so members of a group chat never see
/// each other's pending images. Messages without a sender fall back to the chat.
pub fn dialogue_id(chat_id: ChatId, sender: Option<UserId>) -> ChatId {
    sender.map(ChatId::from).unwrap_or(chat_id)
}

/// Decoded photo waiting for its caption
#[derive(Clone, Debug)]
pub struct PendingImage {
    image: DynamicImage,
    source_format: Option<ImageFormat>,
}

impl PendingImage {
    /// Decode raw photo bytes (JPEG from Telegram, any format `image` reads)
    pub fn decode(bytes: &[u8]) -> Result<Self, ProcessingError> {
        if bytes.is_empty() {
            return Err(ProcessingError::ImageDecode("no image data".to_string()));
        }

        let source_format = image::guess_format(bytes).ok();
        let image = image::load_from_memory(bytes)?;

        Ok(Self {
            image,
            source_format,
        })
    }

    pub fn from_image(image: DynamicImage) -> Self {
        Self {
            image,
            source_format: None,
        }
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn source_format(&self) -> Option<ImageFormat> {
        self.source_format
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    /// Re-encode the pixels as PNG for upload
    pub fn encode_png(&self) -> Result<Vec<u8>, image::ImageError> {
        let mut buffer = Cursor::new(Vec::new());
        self.image.write_to(&mut buffer, ImageOutputFormat::Png)?;
        Ok(buffer.into_inner())
    }
}

/// Extract the caption from an image prompt.
///
/// Returns `None` when the text does not start with [`PROMPT_MARKER`];
/// otherwise the text after the marker with surrounding whitespace removed.
pub fn parse_image_prompt(text: &str) -> Option<String> {
    text.strip_prefix(PROMPT_MARKER)
        .map(|caption| caption.trim().to_string())
}
