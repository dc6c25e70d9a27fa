//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `message_handler`: teloxide endpoint converting messages for the dispatcher
//! - `dispatcher`: routes messages to commands, the image sequencer, or free text
//! - `dialogue_manager`: image-then-prompt state transitions
//! - `transport`: reply and photo download collaborators backed by the Bot API
//! - `ui_builder`: reply texts, command menu, and message splitting

pub mod dialogue_manager;
pub mod dispatcher;
pub mod message_handler;
pub mod transport;
pub mod ui_builder;

// Re-export main handler functions for use in main.rs
pub use dispatcher::{ChatDispatcher, Inbound};
pub use message_handler::{enter_conversation, message_handler};
pub use transport::{PhotoSource, Responder, TelegramTransport};
