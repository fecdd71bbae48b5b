//! Status messages delivered through the Telegram Bot API.

use async_trait::async_trait;
use notebox_core::{ReportError, StatusMessage, StatusReporter};
use teloxide::prelude::*;
use teloxide::types::MessageId;

/// Sends and edits the per-batch status message in the originating chat.
#[derive(Clone)]
pub struct TelegramReporter {
    bot: Bot,
}

impl TelegramReporter {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl StatusReporter for TelegramReporter {
    async fn send(&self, chat_id: i64, text: &str) -> Result<StatusMessage, ReportError> {
        let sent = self
            .bot
            .send_message(ChatId(chat_id), text)
            .await
            .map_err(|e| ReportError(e.to_string()))?;

        Ok(StatusMessage {
            chat_id,
            message_id: sent.id.0,
        })
    }

    async fn edit(&self, message: StatusMessage, text: &str) -> Result<(), ReportError> {
        self.bot
            .edit_message_text(ChatId(message.chat_id), MessageId(message.message_id), text)
            .await
            .map_err(|e| ReportError(e.to_string()))?;
        Ok(())
    }
}
