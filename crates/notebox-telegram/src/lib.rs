//! Telegram front end for Notebox.
//!
//! Receives text messages, buffers bursts per user and, after a short quiet
//! period, turns each burst into a formatted Markdown note in the inbox
//! directory. Progress is reported by editing a single status message.
//!
//! # Environment Variables
//!
//! Required:
//! - `TELEGRAM_BOT_TOKEN`: Bot token from @BotFather
//! - `GEMINI_API_KEY`: Key for the Gemini API (without it every note fails with a notice)
//!
//! Optional:
//! - `GEMINI_MODEL`: Model to use (default: gemini-2.5-flash)
//! - `NOTEBOX_INBOX_DIR`: Where notes are written (default: ~/.notebox/inbox)
//! - `NOTEBOX_QUIET_PERIOD_MS`: Debounce window (default: 2500)
//! - `NOTEBOX_PROMPT_FILE`: Replacement system instruction
//!
//! # Example
//!
//! ```no_run
//! use notebox_core::NoteboxConfig;
//! use notebox_telegram::NoteboxBot;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NoteboxConfig::from_env()?;
//!     let bot = NoteboxBot::new(config)?;
//!     bot.start_polling().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Commands
//!
//! - `/start` - Welcome message
//! - `/help` - Show available commands
//! - `/status` - Show buffered messages and settings

pub mod bot;
pub mod error;
pub mod handlers;
pub mod reporter;
pub mod state;

pub use bot::NoteboxBot;
pub use error::{Result, TelegramError};
pub use handlers::{classify_parts, is_attachment, route, Command, Inbound, Outcome, UNSUPPORTED_NOTICE};
pub use reporter::TelegramReporter;
pub use state::{create_shared_state, TelegramState};
