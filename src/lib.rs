//! # Gemini Telegram Bot
//!
//! A Telegram bot that answers questions, writes code, and describes images
//! by forwarding them to Google's Gemini models.

pub mod audit;
pub mod bot;
pub mod classifier;
pub mod config;
pub mod dialogue;
pub mod errors;
pub mod gemini;
pub mod generation;
pub mod localization;
