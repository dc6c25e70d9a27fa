//! Routing of incoming messages to commands, the image sequencer, or the
//! free-text generation path.

use anyhow::Result;
use std::sync::Arc;
use teloxide::types::{ChatId, UserId};
use tracing::{debug, error, info, warn};

use crate::audit::AuditSink;
use crate::classifier::{classify, Command, MessageKind, PhotoVariant};
use crate::dialogue::{dialogue_id, ConversationDialogue, ConversationStorage};
use crate::errors::{GenerationError, ProcessingError};
use crate::generation::{strip_markup, GenerationClient, GenerationRequest};
use crate::localization::t;

use super::dialogue_manager::{handle_photo_input, handle_prompt_input, PromptOutcome};
use super::transport::{PhotoSource, Responder};
use super::ui_builder::{
    greeting_reply, help_message, image_instructions, processing_failed_message, start_message,
    FailureStage,
};

/// Transport-neutral incoming message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub chat_id: ChatId,
    /// Telegram account that sent the message, absent for channel posts
    pub sender: Option<UserId>,
    /// Name written to the audit log and used in greetings
    pub user: String,
    pub text: Option<String>,
    pub photos: Vec<PhotoVariant>,
}

impl Inbound {
    /// Dialogue of this message's sender in `storage`
    pub fn dialogue(&self, storage: Arc<ConversationStorage>) -> ConversationDialogue {
        ConversationDialogue::new(storage, dialogue_id(self.chat_id, self.sender))
    }
}

/// Routes every incoming message and sends the replies
pub struct ChatDispatcher {
    generator: Arc<dyn GenerationClient>,
    responder: Arc<dyn Responder>,
    photo_source: Arc<dyn PhotoSource>,
    audit: Arc<dyn AuditSink>,
    bot_username: String,
}

impl ChatDispatcher {
    pub fn new(
        generator: Arc<dyn GenerationClient>,
        responder: Arc<dyn Responder>,
        photo_source: Arc<dyn PhotoSource>,
        audit: Arc<dyn AuditSink>,
        bot_username: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            responder,
            photo_source,
            audit,
            bot_username: bot_username.into(),
        }
    }

    /// Handle one incoming message within its sender's dialogue. Never fails:
    /// processing errors become a retry suggestion for the user, delivery
    /// errors are logged.
    pub async fn handle(&self, inbound: Inbound, dialogue: ConversationDialogue) {
        let chat_id = inbound.chat_id;
        let kind = classify(inbound.text.as_deref(), &inbound.photos);

        // Every text message is audited, whatever route it takes
        let audited_text = inbound
            .text
            .as_deref()
            .filter(|_| !matches!(kind, MessageKind::Photo(_)));
        if let Some(text) = audited_text {
            self.record_audit(&inbound.user, chat_id, text).await;
        }

        let awaiting_prompt = match dialogue.get_or_default().await {
            Ok(state) => state.is_awaiting_in(chat_id),
            Err(e) => {
                error!(user_id = %chat_id, error = %e, "Failed to read conversation state");
                false
            }
        };

        let result = match kind {
            MessageKind::Command(command) => self.handle_command(&inbound, command).await,
            MessageKind::UnknownCommand(name) => {
                debug!(user_id = %chat_id, command = %name, "Ignoring unknown command");
                Ok(())
            }
            MessageKind::Photo(photo) => self.handle_photo(chat_id, &dialogue, &photo).await,
            MessageKind::FreeText(text) if text.trim().is_empty() => {
                debug!(user_id = %chat_id, "Ignoring message without text or photo");
                Ok(())
            }
            MessageKind::Greeting(text) | MessageKind::FreeText(text) if awaiting_prompt => {
                self.handle_prompt(chat_id, &dialogue, &text).await
            }
            MessageKind::Greeting(_) => {
                self.reply(chat_id, &greeting_reply(&self.bot_username)).await
            }
            MessageKind::FreeText(text) => self.handle_free_text(chat_id, &text).await,
        };

        if let Err(e) = result {
            error!(user_id = %chat_id, error = %e, "Failed to deliver reply");
        }
    }

    async fn record_audit(&self, user: &str, chat_id: ChatId, text: &str) {
        if let Err(e) = self.audit.record(user, text).await {
            warn!(user_id = %chat_id, error = %e, "Failed to write audit log");
        }
    }

    async fn handle_command(&self, inbound: &Inbound, command: Command) -> Result<()> {
        let chat_id = inbound.chat_id;
        debug!(user_id = %chat_id, command = ?command, "Handling command");

        match command {
            Command::Start => self.reply(chat_id, &start_message(&inbound.user)).await,
            Command::Help => self.reply(chat_id, &help_message(&self.bot_username)).await,
            Command::Image => {
                for message in image_instructions() {
                    self.reply(chat_id, &message).await?;
                }
                Ok(())
            }
            Command::GenerateCode(prompt) if prompt.is_empty() => {
                self.reply(chat_id, &t("code-usage")).await
            }
            Command::GenerateCode(prompt) => self.handle_code(chat_id, prompt).await,
        }
    }

    async fn handle_code(&self, chat_id: ChatId, prompt: String) -> Result<()> {
        self.reply(chat_id, &t("code-generating")).await?;

        let request = GenerationRequest::Code {
            prompt: prompt.clone(),
        };
        match self.generator.generate(request).await {
            Ok(code) => self.reply(chat_id, &code).await,
            Err(e) => {
                self.fail(chat_id, &prompt, FailureStage::Code, &ProcessingError::from(e))
                    .await
            }
        }
    }

    async fn handle_photo(
        &self,
        chat_id: ChatId,
        dialogue: &ConversationDialogue,
        photo: &PhotoVariant,
    ) -> Result<()> {
        debug!(
            user_id = %chat_id,
            width = photo.width,
            height = photo.height,
            "Received photo message from user"
        );

        let stored = match self.photo_source.fetch(&photo.file_id).await {
            Ok(bytes) => handle_photo_input(dialogue, chat_id, &bytes).await,
            Err(e) => Err(ProcessingError::Download(e.to_string())),
        };

        match stored {
            Ok(outcome) => {
                info!(user_id = %chat_id, outcome = ?outcome, "Image waiting for prompt");
                self.reply(chat_id, &t("image-received")).await
            }
            Err(e) => self.fail(chat_id, "<photo>", FailureStage::Image, &e).await,
        }
    }

    async fn handle_prompt(
        &self,
        chat_id: ChatId,
        dialogue: &ConversationDialogue,
        text: &str,
    ) -> Result<()> {
        let outcome =
            handle_prompt_input(dialogue, chat_id, text, self.generator.as_ref()).await;

        match outcome {
            Ok(PromptOutcome::MissingMarker) => {
                self.reply(chat_id, &t("prompt-missing-marker")).await
            }
            Ok(PromptOutcome::MissingImage) => {
                self.reply(chat_id, &t("prompt-missing-image")).await
            }
            Ok(PromptOutcome::Answered(answer)) => {
                info!(user_id = %chat_id, "Image prompt answered");
                self.reply(chat_id, &t("prompt-processing")).await?;
                self.reply(chat_id, &answer).await
            }
            Ok(PromptOutcome::Failed(e)) => {
                self.fail(chat_id, text, FailureStage::Prompt, &ProcessingError::from(e))
                    .await
            }
            Err(e) => self.fail(chat_id, text, FailureStage::Prompt, &e).await,
        }
    }

    async fn handle_free_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.reply(chat_id, &t("text-generating")).await?;
        info!(user_id = %chat_id, message_length = text.len(), "Generating free-text response");

        let request = GenerationRequest::Text {
            prompt: text.to_string(),
        };
        let cleaned = self
            .generator
            .generate(request)
            .await
            .map(|output| strip_markup(&output))
            .and_then(|cleaned| {
                if cleaned.trim().is_empty() {
                    Err(GenerationError::EmptyOutput)
                } else {
                    Ok(cleaned)
                }
            });

        match cleaned {
            Ok(cleaned) => self.reply(chat_id, &cleaned).await,
            Err(e) => {
                self.fail(chat_id, text, FailureStage::Response, &ProcessingError::from(e))
                    .await
            }
        }
    }

    async fn fail(
        &self,
        chat_id: ChatId,
        text: &str,
        stage: FailureStage,
        err: &ProcessingError,
    ) -> Result<()> {
        error!(
            user_id = %chat_id,
            stage = stage.as_str(),
            text = %text,
            error = %err,
            "Processing failed"
        );
        self.reply(chat_id, &processing_failed_message(stage)).await
    }

    async fn reply(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.responder.send_text(chat_id, text).await
    }
}
