//! # Error Types Module
//!
//! Error types for the generation service and for message processing.
//! Users only ever see a single "processing failed" reply; the variants here
//! exist for logs.

use teloxide::dispatching::dialogue::InMemStorageError;

/// Failure of a call to the generation service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Network or connection errors
    Transport(String),
    /// Non-success HTTP status returned by the service
    Service { status: u16, message: String },
    /// The service refused the prompt or the produced content
    ContentRejected(String),
    /// The service answered without any usable text
    EmptyOutput,
    /// The response body could not be understood
    MalformedResponse(String),
    /// The request could not be built (image re-encoding failed)
    Encoding(String),
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationError::Transport(msg) => write!(f, "Transport error: {msg}"),
            GenerationError::Service { status, message } => {
                write!(f, "Service error ({status}): {message}")
            }
            GenerationError::ContentRejected(reason) => write!(f, "Content rejected: {reason}"),
            GenerationError::EmptyOutput => write!(f, "Empty model output"),
            GenerationError::MalformedResponse(msg) => write!(f, "Malformed response: {msg}"),
            GenerationError::Encoding(msg) => write!(f, "Encoding error: {msg}"),
        }
    }
}

impl std::error::Error for GenerationError {}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => GenerationError::Service {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => GenerationError::Transport(err.to_string()),
        }
    }
}

/// Failure while handling a single incoming message
#[derive(Debug)]
pub enum ProcessingError {
    /// The photo could not be fetched from Telegram
    Download(String),
    /// The downloaded bytes are not a decodable image
    ImageDecode(String),
    /// The generation service failed
    Generation(GenerationError),
    /// The conversation state could not be read or written
    Storage(String),
}

impl std::fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingError::Download(msg) => write!(f, "Download error: {msg}"),
            ProcessingError::ImageDecode(msg) => write!(f, "Image decode error: {msg}"),
            ProcessingError::Generation(err) => write!(f, "Generation failed: {err}"),
            ProcessingError::Storage(msg) => write!(f, "Conversation storage error: {msg}"),
        }
    }
}

impl std::error::Error for ProcessingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProcessingError::Generation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GenerationError> for ProcessingError {
    fn from(err: GenerationError) -> Self {
        ProcessingError::Generation(err)
    }
}

impl From<InMemStorageError> for ProcessingError {
    fn from(err: InMemStorageError) -> Self {
        ProcessingError::Storage(err.to_string())
    }
}

impl From<image::ImageError> for ProcessingError {
    fn from(err: image::ImageError) -> Self {
        ProcessingError::ImageDecode(err.to_string())
    }
}
