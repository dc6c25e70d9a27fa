//! Generation client seam: request shapes, the client trait, and reply shaping.

use async_trait::async_trait;

use crate::dialogue::PendingImage;
use crate::errors::GenerationError;

/// Characters the model uses for Markdown emphasis and headings
const MARKUP_CHARS: [char; 2] = ['#', '*'];

/// A single request to the generation service
#[derive(Debug, Clone)]
pub enum GenerationRequest {
    /// Free-text question for the general-purpose model
    Text { prompt: String },
    /// Code request for the code model, answered verbatim
    Code { prompt: String },
    /// Caption plus image for the vision-capable model
    Vision { prompt: String, image: PendingImage },
}

impl GenerationRequest {
    pub fn prompt(&self) -> &str {
        match self {
            GenerationRequest::Text { prompt }
            | GenerationRequest::Code { prompt }
            | GenerationRequest::Vision { prompt, .. } => prompt,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GenerationRequest::Text { .. } => "text",
            GenerationRequest::Code { .. } => "code",
            GenerationRequest::Vision { .. } => "vision",
        }
    }
}

/// External generative-AI service
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Submit a request and wait for the generated text
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError>;
}

/// Remove Markdown emphasis and heading characters, which Telegram would
/// otherwise show literally
pub fn strip_markup(text: &str) -> String {
    text.chars().filter(|c| !MARKUP_CHARS.contains(c)).collect()
}
