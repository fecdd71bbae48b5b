//! Shared configuration for Notebox.
//!
//! Locates Notebox's state directory and reads the runtime settings from
//! the environment.
//!
//! # Storage Structure
//!
//! ```text
//! ~/.notebox/
//! ├── .env          # Secrets (bot token, Gemini key)
//! └── inbox/        # Default destination for generated notes
//! ```
//!
//! # Environment Variables
//!
//! - `NOTEBOX_STATE_DIR`: Override the base state directory
//! - `NOTEBOX_INBOX_DIR`: Directory where notes are written
//! - `NOTEBOX_QUIET_PERIOD_MS`: Debounce window in milliseconds (default: 2500)
//! - `NOTEBOX_PROMPT_FILE`: File whose contents replace the built-in system instruction
//! - `GEMINI_API_KEY`: Gemini API key
//! - `GEMINI_MODEL`: Gemini model (default: gemini-2.5-flash)

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::formatter::DEFAULT_MODEL;
use crate::prompt;

/// Environment variable for custom state directory.
pub const STATE_DIR_ENV: &str = "NOTEBOX_STATE_DIR";

/// Environment variable for the notes inbox directory.
pub const INBOX_DIR_ENV: &str = "NOTEBOX_INBOX_DIR";

/// Environment variable for the quiet period in milliseconds.
pub const QUIET_PERIOD_ENV: &str = "NOTEBOX_QUIET_PERIOD_MS";

/// Environment variable for a system instruction override file.
pub const PROMPT_FILE_ENV: &str = "NOTEBOX_PROMPT_FILE";

/// Environment variable for the Gemini API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Environment variable for the Gemini model.
pub const GEMINI_MODEL_ENV: &str = "GEMINI_MODEL";

/// Default quiet period between the last message and the flush.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(2500);

/// Default state directory name under home.
const DEFAULT_STATE_DIR: &str = ".notebox";

const INBOX_SUBDIR: &str = "inbox";

/// Errors raised while assembling the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The quiet period could not be parsed or is zero.
    #[error("Invalid quiet period '{0}': expected a positive number of milliseconds")]
    InvalidQuietPeriod(String),

    /// The prompt override file could not be read.
    #[error("Failed to read prompt file {path}: {source}")]
    PromptFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Get the Notebox state directory.
///
/// The state directory is determined by:
/// 1. `NOTEBOX_STATE_DIR` environment variable if set
/// 2. `~/.notebox` if home directory is available
/// 3. `.notebox` in current directory as fallback
pub fn state_dir() -> PathBuf {
    std::env::var(STATE_DIR_ENV)
        .map(|p| expand_path(&p))
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(DEFAULT_STATE_DIR))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
        })
}

/// Get the `.env` file path holding secrets.
pub fn env_file() -> PathBuf {
    state_dir().join(".env")
}

/// Get the default inbox directory (`~/.notebox/inbox`).
pub fn default_inbox_dir() -> PathBuf {
    state_dir().join(INBOX_SUBDIR)
}

/// Expand a leading `~` in a configured path.
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

/// Parse a quiet period given in milliseconds.
pub fn parse_quiet_period(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(ConfigError::InvalidQuietPeriod(raw.to_string())),
    }
}

/// Runtime settings shared by the buffer, formatter and writer.
#[derive(Debug, Clone)]
pub struct NoteboxConfig {
    /// Directory where notes are written.
    pub inbox_dir: PathBuf,
    /// Inactivity window before a user's fragments are flushed.
    pub quiet_period: Duration,
    /// Gemini API key, if configured.
    pub gemini_api_key: Option<String>,
    /// Gemini model name.
    pub gemini_model: String,
    /// System instruction sent with every note.
    pub system_instruction: String,
}

impl Default for NoteboxConfig {
    fn default() -> Self {
        Self {
            inbox_dir: default_inbox_dir(),
            quiet_period: DEFAULT_QUIET_PERIOD,
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
            system_instruction: prompt::SYSTEM_INSTRUCTION.to_string(),
        }
    }
}

impl NoteboxConfig {
    /// Build the configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var(INBOX_DIR_ENV) {
            config.inbox_dir = expand_path(&dir);
        }

        if let Ok(raw) = std::env::var(QUIET_PERIOD_ENV) {
            config.quiet_period = parse_quiet_period(&raw)?;
        }

        config.gemini_api_key = std::env::var(GEMINI_API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty());

        if let Ok(model) = std::env::var(GEMINI_MODEL_ENV) {
            if !model.trim().is_empty() {
                config.gemini_model = model;
            }
        }

        if let Ok(path) = std::env::var(PROMPT_FILE_ENV) {
            config.system_instruction = prompt::load_from_file(&expand_path(&path))?;
        }

        Ok(config)
    }

    /// Override the inbox directory.
    pub fn with_inbox_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.inbox_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Override the quiet period.
    pub fn with_quiet_period(mut self, quiet_period: Duration) -> Self {
        self.quiet_period = quiet_period;
        self
    }

    /// Check whether the formatting service can be called.
    pub fn has_formatter(&self) -> bool {
        self.gemini_api_key.is_some()
    }
}
