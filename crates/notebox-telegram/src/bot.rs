//! Main Telegram bot implementation.

use std::sync::Arc;

use notebox_core::NoteboxConfig;
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{debug, info, warn};

use crate::error::{Result, TelegramError};
use crate::handlers::{handle_command, handle_message, Command};
use crate::reporter::TelegramReporter;
use crate::state::{create_shared_state, TelegramState};

/// Environment variable holding the bot token.
pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// The Notebox Telegram bot.
pub struct NoteboxBot {
    /// The teloxide bot instance.
    bot: Bot,
    /// Shared state across handlers.
    state: Arc<TelegramState>,
}

impl NoteboxBot {
    /// Create a new bot.
    ///
    /// Requires `TELEGRAM_BOT_TOKEN` environment variable to be set.
    pub fn new(config: NoteboxConfig) -> Result<Self> {
        let token = std::env::var(BOT_TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(TelegramError::NoToken)?;

        Ok(Self::with_token(token, config))
    }

    /// Create a bot from an explicit token.
    pub fn with_token(token: impl Into<String>, config: NoteboxConfig) -> Self {
        let bot = Bot::new(token);
        let reporter = Arc::new(TelegramReporter::new(bot.clone()));
        let state = create_shared_state(config, reporter);

        Self { bot, state }
    }

    /// Shared state used by the handlers.
    pub fn state(&self) -> &Arc<TelegramState> {
        &self.state
    }

    /// Get the bot's username.
    pub async fn get_me(&self) -> Result<String> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| TelegramError::BotStartFailed(e.to_string()))?;
        Ok(me.username().to_string())
    }

    /// Start the bot in long-polling mode and run until Ctrl+C.
    pub async fn start_polling(&self) -> Result<()> {
        info!("Starting Telegram bot in polling mode...");

        // Drop updates queued while the bot was offline.
        self.bot
            .delete_webhook()
            .drop_pending_updates(true)
            .await
            .map_err(|e| TelegramError::BotStartFailed(e.to_string()))?;

        if let Err(e) = self.bot.set_my_commands(Command::bot_commands()).await {
            warn!(error = %e, "Failed to register command menu");
        }

        let bot = self.bot.clone();
        let state_for_commands = Arc::clone(&self.state);
        let state_for_messages = Arc::clone(&self.state);

        let handler = dptree::entry()
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                        let state = Arc::clone(&state_for_commands);
                        info!(chat_id = %msg.chat.id, "Command matched: {:?}", cmd);
                        async move { handle_command(bot, msg, cmd, state).await }
                    }),
            )
            .branch(
                Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
                    let state = Arc::clone(&state_for_messages);
                    async move { handle_message(bot, msg, state).await }
                }),
            );

        let quiet_period = self.state.config().quiet_period;
        let inbox = self.state.config().inbox_dir.display().to_string();
        info!(quiet_ms = quiet_period.as_millis() as u64, inbox = %inbox, "Bot is running! Send /start to begin.");

        Dispatcher::builder(bot, handler)
            .default_handler(|upd| async move {
                debug!("Unhandled update: {:?}", upd.kind);
            })
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        let pending = self.state.buffer().active_sessions();
        if pending > 0 {
            warn!(pending, "Stopping with buffered messages that were not flushed");
        }
        info!("Bot stopped");
        Ok(())
    }
}
