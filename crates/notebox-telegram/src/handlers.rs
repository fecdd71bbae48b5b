//! Command and message handlers for the Telegram bot.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{MediaKind, MessageKind};
use teloxide::utils::command::BotCommands;
use tracing::{debug, info};

use crate::error::TelegramError;
use crate::state::TelegramState;

/// Fixed reply for photos, documents, locations and every other non-text payload.
pub const UNSUPPORTED_NOTICE: &str =
    "📸 Attachments are not supported in message merge mode yet. Send text instead.";

/// Bot commands that can be invoked with /.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot and get help")]
    Start,

    #[command(description = "Show help message")]
    Help,

    #[command(description = "Show buffered messages and settings")]
    Status,
}

/// What an inbound message carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound<'a> {
    /// A text fragment from a known sender.
    Text { user_id: u64, text: &'a str },
    /// A photo, document, location, poll or other non-text payload.
    Attachment,
}

/// What the bot did with an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The fragment was buffered; `pending` fragments now wait for the quiet period.
    Buffered { pending: usize },
    /// The message gets a fixed reply and is not buffered.
    Reply(&'static str),
    /// Nothing to do.
    Ignored,
}

/// Classify a message from its sender, text and attachment flag.
pub fn classify_parts(
    sender: Option<u64>,
    text: Option<&str>,
    has_attachment: bool,
) -> Result<Inbound<'_>, TelegramError> {
    match (text, sender) {
        (Some(text), Some(user_id)) => Ok(Inbound::Text { user_id, text }),
        (Some(_), None) => Err(TelegramError::Protocol("text without a sender".to_string())),
        (None, _) if has_attachment => Ok(Inbound::Attachment),
        (None, _) => Err(TelegramError::Protocol("no text content".to_string())),
    }
}

/// Whether a message carries user content other than plain text.
///
/// Service messages (title changes, pins, chat migration) are not content.
pub fn is_attachment(kind: &MessageKind) -> bool {
    match kind {
        MessageKind::Common(common) => {
            !matches!(common.media_kind, MediaKind::Text(_) | MediaKind::Migration(_))
        }
        MessageKind::Dice(_) => true,
        _ => false,
    }
}

/// Classify a Telegram message.
pub fn classify(msg: &Message) -> Result<Inbound<'_>, TelegramError> {
    classify_parts(
        msg.from.as_ref().map(|u| u.id.0),
        msg.text(),
        is_attachment(&msg.kind),
    )
}

/// Apply a classified message to the buffer.
pub fn route(
    state: &TelegramState,
    chat_id: i64,
    inbound: Result<Inbound<'_>, TelegramError>,
) -> Outcome {
    match inbound {
        Ok(Inbound::Text { user_id, text }) => Outcome::Buffered {
            pending: state.buffer().submit(user_id, chat_id, text),
        },
        Ok(Inbound::Attachment) => Outcome::Reply(UNSUPPORTED_NOTICE),
        Err(e) => {
            debug!(chat_id, error = %e, "Ignoring message");
            Outcome::Ignored
        }
    }
}

/// Handle a regular (non-command) message.
pub async fn handle_message(
    bot: Bot,
    msg: Message,
    state: Arc<TelegramState>,
) -> ResponseResult<()> {
    match route(&state, msg.chat.id.0, classify(&msg)) {
        Outcome::Buffered { pending } => {
            debug!(chat_id = %msg.chat.id, pending, "Message buffered");
        }
        Outcome::Reply(text) => {
            bot.send_message(msg.chat.id, text).await?;
        }
        Outcome::Ignored => {}
    }
    Ok(())
}

/// Handle the /start command.
pub async fn handle_start(
    bot: Bot,
    msg: Message,
    state: Arc<TelegramState>,
) -> ResponseResult<()> {
    let config = state.config();
    let welcome = format!(
        "Welcome to Notebox! 📝\n\n\
        Send me text, in as many messages as you like. Once you pause for {:.1}s \
        I merge everything into one note, format it and save it to your inbox.\n\n\
        Formatting: {}\n\n\
        Type /help for all commands.",
        config.quiet_period.as_secs_f64(),
        if state.has_formatter() {
            format!("✅ {}", config.gemini_model)
        } else {
            "⚠️ disabled (set GEMINI_API_KEY)".to_string()
        }
    );

    bot.send_message(msg.chat.id, welcome).await?;

    info!(chat_id = %msg.chat.id, user = ?msg.from.as_ref().map(|u| &u.username), "User started bot");
    Ok(())
}

/// Handle the /help command.
pub async fn handle_help(bot: Bot, msg: Message) -> ResponseResult<()> {
    let help_text = Command::descriptions().to_string();
    bot.send_message(msg.chat.id, help_text).await?;
    Ok(())
}

/// Status text for a user.
pub fn status_text(state: &TelegramState, user_id: Option<u64>) -> String {
    let config = state.config();
    let pending = user_id.map(|id| state.buffer().pending(id)).unwrap_or(0);

    format!(
        "📥 Buffered messages: {}\n\
        ⏱ Quiet period: {:.1}s\n\
        📁 Inbox: {}\n\
        🤖 Model: {}",
        pending,
        config.quiet_period.as_secs_f64(),
        config.inbox_dir.display(),
        if state.has_formatter() {
            config.gemini_model.as_str()
        } else {
            "not configured"
        }
    )
}

/// Handle the /status command.
pub async fn handle_status(
    bot: Bot,
    msg: Message,
    state: Arc<TelegramState>,
) -> ResponseResult<()> {
    let text = status_text(&state, msg.from.as_ref().map(|u| u.id.0));
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

/// Dispatch a parsed command.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<TelegramState>,
) -> ResponseResult<()> {
    match cmd {
        Command::Start => handle_start(bot, msg, state).await,
        Command::Help => handle_help(bot, msg).await,
        Command::Status => handle_status(bot, msg, state).await,
    }
}
