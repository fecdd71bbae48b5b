//! Notebox Core - buffering, formatting and storage of chat notes.
//!
//! This crate holds everything that does not depend on the chat transport:
//!
//! - **buffer**: per-user debounce buffer coalescing message bursts into batches
//! - **config**: environment-driven settings and default paths
//! - **formatter**: the `NoteFormatter` seam and the Gemini client
//! - **pipeline**: acknowledgment, formatting, writing and status reporting per batch
//! - **prompt**: the system instruction given to the formatter
//! - **writer**: filename derivation and atomic note writes

pub mod buffer;
pub mod config;
pub mod formatter;
pub mod pipeline;
pub mod prompt;
pub mod writer;

pub use buffer::{Batch, BatchSink, DebounceBuffer, FRAGMENT_SEPARATOR};
pub use config::{ConfigError, NoteboxConfig, DEFAULT_QUIET_PERIOD};
pub use formatter::{FormattingError, GeminiFormatter, NoteFormatter, DEFAULT_MODEL};
pub use pipeline::{
    failure_notice, success_notice, NotePipeline, PipelineError, ReportError, StatusMessage,
    StatusReporter, ACK_NOTICE,
};
pub use writer::{note_filename, sanitize_title, FilesystemError, NoteWriter, SavedNote};
