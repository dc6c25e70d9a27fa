use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

use gemini_bot::audit::FileAuditLog;
use gemini_bot::bot::{self, ChatDispatcher, TelegramTransport};
use gemini_bot::config::{BotConfig, LogFormat};
use gemini_bot::dialogue::ConversationStorage;
use gemini_bot::gemini::GeminiClient;
use gemini_bot::localization::init_localization;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = BotConfig::from_env()?;
    init_tracing(config.log_format);

    info!("Starting Gemini Telegram Bot");

    init_localization()?;

    let bot = Bot::new(config.telegram_token.clone());
    if let Err(e) = bot.set_my_commands(bot::ui_builder::bot_commands()).await {
        warn!(error = %e, "Failed to register command menu");
    }

    info!(audit_log = %config.audit_log_path.display(), "Appending messages to audit log");

    let transport = Arc::new(TelegramTransport::new(bot.clone()));
    let dispatcher = Arc::new(ChatDispatcher::new(
        Arc::new(GeminiClient::new(config.gemini.clone())),
        transport.clone(),
        transport,
        Arc::new(FileAuditLog::new(config.audit_log_path.clone())),
        config.bot_username.clone(),
    ));

    info!("Bot initialized, starting dispatcher");

    let storage = ConversationStorage::new();

    let handler = dptree::entry().branch(
        Update::filter_message()
            .map(bot::enter_conversation)
            .endpoint(bot::message_handler),
    );

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![dispatcher, storage])
        // Dialogues are per sender, so updates of one sender are handled in order
        .distribution_function(|upd| upd.from().map(|user| user.id))
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error has occurred in the dispatcher",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}
