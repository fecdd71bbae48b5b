//! Turning a flushed batch into a saved note.
//!
//! For every batch the pipeline sends an acknowledgment to the chat, calls
//! the formatter, writes the result and edits the acknowledgment into a
//! success or failure notice. Errors stop at this boundary: they are logged
//! and reported to the user, never propagated into the buffer.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::buffer::{Batch, BatchSink};
use crate::formatter::{FormattingError, NoteFormatter};
use crate::writer::{FilesystemError, NoteWriter, SavedNote};

/// Acknowledgment sent right before the formatting call.
pub const ACK_NOTICE: &str = "⏳ Got it. Structuring your note...";

/// Errors that end a batch without a saved note.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The formatting service failed.
    #[error(transparent)]
    Formatting(#[from] FormattingError),

    /// The note could not be written.
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Failure to deliver a status message to the chat.
#[derive(Debug, Error)]
#[error("Failed to deliver status message: {0}")]
pub struct ReportError(pub String);

/// A status message that can be edited later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusMessage {
    pub chat_id: i64,
    pub message_id: i32,
}

/// Outbound side of the transport, used to keep the user informed.
#[async_trait]
pub trait StatusReporter: Send + Sync {
    /// Send a new message to `chat_id`.
    async fn send(&self, chat_id: i64, text: &str) -> Result<StatusMessage, ReportError>;

    /// Replace the text of a previously sent message.
    async fn edit(&self, message: StatusMessage, text: &str) -> Result<(), ReportError>;
}

/// Success notice with the true number of merged fragments.
pub fn success_notice(note: &SavedNote, fragment_count: usize) -> String {
    format!(
        "✅ Note saved: `{}`\n(Messages merged: {})",
        note.filename, fragment_count
    )
}

/// Failure notice carrying the error description.
pub fn failure_notice(err: &PipelineError) -> String {
    format!("❌ Error: {}", err)
}

/// Formats and stores batches, reporting progress through a [`StatusReporter`].
pub struct NotePipeline {
    formatter: Arc<dyn NoteFormatter>,
    writer: NoteWriter,
    reporter: Arc<dyn StatusReporter>,
    system_instruction: String,
}

impl NotePipeline {
    /// Create a pipeline.
    pub fn new(
        formatter: Arc<dyn NoteFormatter>,
        writer: NoteWriter,
        reporter: Arc<dyn StatusReporter>,
        system_instruction: impl Into<String>,
    ) -> Self {
        Self {
            formatter,
            writer,
            reporter,
            system_instruction: system_instruction.into(),
        }
    }

    /// The writer notes are stored with.
    pub fn writer(&self) -> &NoteWriter {
        &self.writer
    }

    /// Process one batch end to end.
    pub async fn process(&self, batch: &Batch) -> Result<SavedNote, PipelineError> {
        let status = match self.reporter.send(batch.chat_id, ACK_NOTICE).await {
            Ok(status) => Some(status),
            Err(e) => {
                warn!(chat_id = batch.chat_id, error = %e, "Could not send acknowledgment");
                None
            }
        };

        let result = self.format_and_write(batch).await;

        let notice = match &result {
            Ok(note) => {
                info!(
                    user_id = batch.user_id,
                    file = %note.path.display(),
                    fragments = batch.fragment_count,
                    "Note saved"
                );
                success_notice(note, batch.fragment_count)
            }
            Err(e) => {
                error!(user_id = batch.user_id, error = %e, "Failed to produce note");
                failure_notice(e)
            }
        };

        self.report(batch.chat_id, status, &notice).await;
        result
    }

    async fn format_and_write(&self, batch: &Batch) -> Result<SavedNote, PipelineError> {
        let formatted = self
            .formatter
            .format(&self.system_instruction, &batch.text)
            .await?;
        let note = self.writer.write(&formatted, &batch.text)?;
        Ok(note)
    }

    /// Edit the acknowledgment, or send a fresh message if there is none.
    async fn report(&self, chat_id: i64, status: Option<StatusMessage>, notice: &str) {
        let delivered = match status {
            Some(status) => self.reporter.edit(status, notice).await,
            None => self.reporter.send(chat_id, notice).await.map(|_| ()),
        };

        if let Err(e) = delivered {
            warn!(chat_id, error = %e, "Could not deliver final status");
        }
    }
}

#[async_trait]
impl BatchSink for NotePipeline {
    async fn handle(&self, batch: Batch) {
        // Outcome is already reported to the chat and logged.
        let _ = self.process(&batch).await;
    }
}
