//! Shared fakes for driving the dispatcher without Telegram or Gemini

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use gemini_bot::audit::{format_entry, AuditSink};
use gemini_bot::bot::{ChatDispatcher, Inbound, PhotoSource, Responder};
use gemini_bot::classifier::PhotoVariant;
use gemini_bot::dialogue::{ConversationState, ConversationStorage};
use gemini_bot::errors::GenerationError;
use gemini_bot::generation::{GenerationClient, GenerationRequest};
use gemini_bot::localization::init_localization;
use image::{DynamicImage, ImageOutputFormat};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use teloxide::types::{ChatId, UserId};

pub const BOT_USERNAME: &str = "test_gemini_bot";

/// Stable Telegram account id for the test users
pub fn sender_id(user: &str) -> UserId {
    match user {
        "alice" => UserId(1001),
        "bob" => UserId(2002),
        _ => UserId(9999),
    }
}

pub fn text_message(chat_id: ChatId, user: &str, text: &str) -> Inbound {
    Inbound {
        chat_id,
        sender: Some(sender_id(user)),
        user: user.to_string(),
        text: Some(text.to_string()),
        photos: Vec::new(),
    }
}

#[derive(Default)]
pub struct RecordingResponder {
    sent: Mutex<Vec<(ChatId, String)>>,
}

impl RecordingResponder {
    pub fn messages(&self, chat_id: ChatId) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == chat_id)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Responder for RecordingResponder {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakePhotos {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl FakePhotos {
    pub fn insert(&self, file_id: &str, bytes: Vec<u8>) {
        self.files.lock().unwrap().insert(file_id.to_string(), bytes);
    }
}

#[async_trait]
impl PhotoSource for FakePhotos {
    async fn fetch(&self, file_id: &str) -> Result<Vec<u8>> {
        match self.files.lock().unwrap().get(file_id) {
            Some(bytes) => Ok(bytes.clone()),
            None => bail!("unknown file {file_id}"),
        }
    }
}

#[derive(Default)]
pub struct MemoryAudit {
    lines: Mutex<Vec<String>>,
}

impl MemoryAudit {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAudit {
    async fn record(&self, user: &str, text: &str) -> Result<()> {
        self.lines.lock().unwrap().push(format_entry(user, text));
        Ok(())
    }
}

/// Generation client answering every request with the same scripted reply
pub struct ScriptedClient {
    reply: Mutex<Result<String, GenerationError>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedClient {
    pub fn answering(reply: &str) -> Self {
        Self {
            reply: Mutex::new(Ok(reply.to_string())),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: GenerationError) -> Self {
        Self {
            reply: Mutex::new(Err(error)),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn set_reply(&self, reply: Result<String, GenerationError>) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        self.requests.lock().unwrap().push(request);
        self.reply.lock().unwrap().clone()
    }
}

pub struct Harness {
    pub dispatcher: ChatDispatcher,
    pub storage: Arc<ConversationStorage>,
    pub responder: Arc<RecordingResponder>,
    pub photos: Arc<FakePhotos>,
    pub audit: Arc<MemoryAudit>,
    pub client: Arc<ScriptedClient>,
}

impl Harness {
    pub fn new(client: ScriptedClient) -> Self {
        let _ = init_localization();

        let responder = Arc::new(RecordingResponder::default());
        let photos = Arc::new(FakePhotos::default());
        let audit = Arc::new(MemoryAudit::default());
        let client = Arc::new(client);

        let dispatcher = ChatDispatcher::new(
            client.clone(),
            responder.clone(),
            photos.clone(),
            audit.clone(),
            BOT_USERNAME,
        );

        Self {
            dispatcher,
            storage: ConversationStorage::new(),
            responder,
            photos,
            audit,
            client,
        }
    }

    pub async fn deliver(&self, inbound: Inbound) {
        let dialogue = inbound.dialogue(self.storage.clone());
        self.dispatcher.handle(inbound, dialogue).await;
    }

    pub async fn send_text(&self, chat_id: ChatId, user: &str, text: &str) {
        self.deliver(text_message(chat_id, user, text)).await;
    }

    /// Send a photo message from alice whose largest variant has the given bytes
    pub async fn send_photo(&self, chat_id: ChatId, file_id: &str, bytes: Vec<u8>) {
        self.send_photo_as(chat_id, "alice", file_id, bytes).await;
    }

    pub async fn send_photo_as(&self, chat_id: ChatId, user: &str, file_id: &str, bytes: Vec<u8>) {
        self.photos.insert(file_id, bytes);
        let thumbnail = PhotoVariant {
            file_id: format!("{file_id}-thumb"),
            width: 90,
            height: 60,
            file_size: 1_000,
        };
        let full = PhotoVariant {
            file_id: file_id.to_string(),
            width: 1280,
            height: 853,
            file_size: 120_000,
        };

        self.deliver(Inbound {
            chat_id,
            sender: Some(sender_id(user)),
            user: user.to_string(),
            text: None,
            photos: vec![thumbnail, full],
        })
        .await;
    }

    /// Conversation state of `user`
    pub async fn state(&self, chat_id: ChatId, user: &str) -> ConversationState {
        text_message(chat_id, user, "")
            .dialogue(self.storage.clone())
            .get_or_default()
            .await
            .expect("in-memory storage never fails to read")
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(DynamicImage::new_rgba8(width, height), ImageOutputFormat::Png)
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(DynamicImage::new_rgb8(width, height), ImageOutputFormat::Jpeg(90))
}

fn encode(image: DynamicImage, format: ImageOutputFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), format)
        .expect("Failed to encode test image");
    bytes
}
