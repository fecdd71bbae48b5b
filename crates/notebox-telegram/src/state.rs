//! Shared state for the Telegram bot.

use std::sync::Arc;

use notebox_core::{
    DebounceBuffer, GeminiFormatter, NoteboxConfig, NotePipeline, NoteWriter, StatusReporter,
};

/// Shared state for the Telegram bot, accessible across all handlers.
pub struct TelegramState {
    /// Per-user debounce buffer feeding the note pipeline.
    buffer: DebounceBuffer,
    /// Settings the bot was started with.
    config: NoteboxConfig,
}

impl TelegramState {
    /// Create state around an existing buffer.
    pub fn new(buffer: DebounceBuffer, config: NoteboxConfig) -> Self {
        Self { buffer, config }
    }

    /// Wire the Gemini formatter, note writer and `reporter` into a buffer.
    pub fn with_reporter(config: NoteboxConfig, reporter: Arc<dyn StatusReporter>) -> Self {
        let formatter = Arc::new(GeminiFormatter::new(
            config.gemini_api_key.clone(),
            config.gemini_model.clone(),
        ));
        let pipeline = NotePipeline::new(
            formatter,
            NoteWriter::new(&config.inbox_dir),
            reporter,
            config.system_instruction.clone(),
        );
        let buffer = DebounceBuffer::new(config.quiet_period, Arc::new(pipeline));

        Self::new(buffer, config)
    }

    /// The debounce buffer.
    pub fn buffer(&self) -> &DebounceBuffer {
        &self.buffer
    }

    /// The active configuration.
    pub fn config(&self) -> &NoteboxConfig {
        &self.config
    }

    /// Check if the formatting service is configured.
    pub fn has_formatter(&self) -> bool {
        self.config.has_formatter()
    }
}

/// Create shared state for the bot.
pub fn create_shared_state(
    config: NoteboxConfig,
    reporter: Arc<dyn StatusReporter>,
) -> Arc<TelegramState> {
    Arc::new(TelegramState::with_reporter(config, reporter))
}
