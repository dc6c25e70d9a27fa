//! Dialogue Manager module: the image-then-prompt transitions of a conversation

use teloxide::types::ChatId;
use tracing::{debug, info, warn};

use crate::dialogue::{parse_image_prompt, ConversationDialogue, ConversationState, PendingImage};
use crate::errors::{GenerationError, ProcessingError};
use crate::generation::{GenerationClient, GenerationRequest};

/// Result of feeding a photo into a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoOutcome {
    Stored,
    /// An earlier image was still waiting and has been dropped
    Replaced,
}

/// Result of feeding text into a conversation awaiting its prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome {
    /// Text lacks the `Image:` marker; nothing changed
    MissingMarker,
    /// No image is waiting in this chat; nothing changed
    MissingImage,
    /// The vision model answered
    Answered(String),
    /// The vision model failed; the image is gone all the same
    Failed(GenerationError),
}

/// Decode a photo sent in `chat_id` and move the dialogue to `AwaitingPrompt`.
///
/// On decode failure the dialogue is left untouched.
pub async fn handle_photo_input(
    dialogue: &ConversationDialogue,
    chat_id: ChatId,
    bytes: &[u8],
) -> Result<PhotoOutcome, ProcessingError> {
    let image = PendingImage::decode(bytes)?;
    let (width, height) = image.dimensions();

    let previous = dialogue.get_or_default().await?;
    dialogue
        .update(ConversationState::AwaitingPrompt { chat_id, image })
        .await?;

    if previous.pending_image().is_some() {
        info!(width, height, "Replaced pending image");
        Ok(PhotoOutcome::Replaced)
    } else {
        debug!(width, height, "Stored pending image");
        Ok(PhotoOutcome::Stored)
    }
}

/// Handle a text message sent in `chat_id` while an image waits for its prompt.
///
/// The marker is checked before the pending image. Once both are present
/// the dialogue returns to `Idle` and the client is called exactly once,
/// whatever its outcome.
pub async fn handle_prompt_input(
    dialogue: &ConversationDialogue,
    chat_id: ChatId,
    text: &str,
    client: &dyn GenerationClient,
) -> Result<PromptOutcome, ProcessingError> {
    let Some(caption) = parse_image_prompt(text) else {
        debug!("Prompt without marker, asking again");
        return Ok(PromptOutcome::MissingMarker);
    };

    let image = match dialogue.get_or_default().await? {
        ConversationState::AwaitingPrompt {
            chat_id: origin,
            image,
        } if origin == chat_id => image,
        _ => {
            debug!("Prompt arrived without a pending image");
            return Ok(PromptOutcome::MissingImage);
        }
    };
    dialogue.update(ConversationState::Idle).await?;

    let request = GenerationRequest::Vision {
        prompt: caption,
        image,
    };

    match client.generate(request).await {
        Ok(answer) => Ok(PromptOutcome::Answered(answer)),
        Err(e) => {
            warn!(error = %e, "Vision generation failed, pending image discarded");
            Ok(PromptOutcome::Failed(e))
        }
    }
}
