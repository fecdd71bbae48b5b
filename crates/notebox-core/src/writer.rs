//! Writing formatted notes to the inbox directory.
//!
//! Each batch becomes one Markdown file named
//! `<source-tag>_<YYYY-MM-DD_HH-MM>_<title>.md`, where the title is derived
//! from the first characters of the raw input.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};
use thiserror::Error;
use tracing::debug;

/// Source tag prefixed to every note filename.
pub const DEFAULT_SOURCE_TAG: &str = "Gemini";

/// Timestamp format used in filenames (minute precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M";

/// Number of input characters considered for the title.
const TITLE_CHARS: usize = 20;

/// Title used when nothing survives sanitization.
const FALLBACK_TITLE: &str = "untitled";

/// Errors that can occur while writing a note.
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create the destination directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the note file.
    #[error("failed to write {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A note that has been written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedNote {
    /// File name inside the inbox directory.
    pub filename: String,
    /// Full path of the written file.
    pub path: PathBuf,
}

/// Build a short filesystem-safe title from the start of the input.
///
/// Looks at the first 20 characters of the first line only, so text after a
/// line break (such as the next fragment of a batch) never reaches the title.
/// Keeps alphanumeric characters, spaces, underscores and hyphens, trims the
/// result and turns spaces into underscores.
pub fn sanitize_title(input: &str) -> String {
    let kept: String = input
        .chars()
        .take(TITLE_CHARS)
        .take_while(|c| *c != '\n' && *c != '\r')
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect();

    let title = kept.trim().replace(' ', "_");
    if title.is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        title
    }
}

/// Build the note filename for the given time and raw input.
pub fn note_filename<Tz>(source_tag: &str, at: &DateTime<Tz>, input: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}_{}_{}.md",
        source_tag,
        at.format(TIMESTAMP_FORMAT),
        sanitize_title(input)
    )
}

/// Writes formatted notes into a directory.
#[derive(Debug, Clone)]
pub struct NoteWriter {
    dir: PathBuf,
    source_tag: String,
}

impl NoteWriter {
    /// Create a writer for the given inbox directory.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            source_tag: DEFAULT_SOURCE_TAG.to_string(),
        }
    }

    /// Use a different filename prefix.
    pub fn with_source_tag(mut self, tag: impl Into<String>) -> Self {
        self.source_tag = tag.into();
        self
    }

    /// The inbox directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `body` as a new note titled after `source_text`, timestamped now.
    pub fn write(&self, body: &str, source_text: &str) -> Result<SavedNote, FilesystemError> {
        self.write_at(body, source_text, &Local::now())
    }

    /// Write `body` as a new note titled after `source_text` at a given time.
    pub fn write_at<Tz>(
        &self,
        body: &str,
        source_text: &str,
        at: &DateTime<Tz>,
    ) -> Result<SavedNote, FilesystemError>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        fs::create_dir_all(&self.dir).map_err(|source| FilesystemError::DirectoryError {
            path: self.dir.clone(),
            source,
        })?;

        let filename = note_filename(&self.source_tag, at, source_text);
        let path = self.dir.join(&filename);
        atomic_write(&path, body.as_bytes())?;

        debug!(path = %path.display(), bytes = body.len(), "Note written");
        Ok(SavedNote { filename, path })
    }
}

/// Write to a temp file in the same directory, then rename over `path`.
fn atomic_write(path: &Path, data: &[u8]) -> Result<(), FilesystemError> {
    let write_err = |source| FilesystemError::WriteError {
        path: path.to_path_buf(),
        source,
    };

    let dir = path.parent().unwrap_or(Path::new("."));
    let mut temp_file = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    temp_file.write_all(data).map_err(write_err)?;
    temp_file.flush().map_err(write_err)?;
    temp_file.persist(path).map_err(|e| write_err(e.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 5, 42).unwrap()
    }

    #[test]
    fn test_sanitize_title_basic() {
        assert_eq!(sanitize_title("buy milk\n\nand eggs"), "buy_milk");
    }

    #[test]
    fn test_sanitize_title_long_first_line() {
        let batch = ["remember to call the plumber tomorrow", "and the dentist"].join("\n\n");
        assert_eq!(sanitize_title(&batch), "remember_to_call_the");
    }

    #[test]
    fn test_sanitize_title_stops_at_crlf() {
        assert_eq!(sanitize_title("buy milk\r\nand eggs"), "buy_milk");
        assert_eq!(sanitize_title("milk\rbread"), "milk");
    }

    #[test]
    fn test_sanitize_title_leading_newline_falls_back() {
        assert_eq!(sanitize_title("\nbuy milk"), FALLBACK_TITLE);
    }

    #[test]
    fn test_sanitize_title_truncates_to_twenty_chars() {
        // First 20 chars: "nmap -sV 10.0.0.1 --" -> dots dropped
        assert_eq!(sanitize_title("nmap -sV 10.0.0.1 --script vuln"), "nmap_-sV_10001_--");
    }

    #[test]
    fn test_sanitize_title_strips_punctuation_and_edges() {
        assert_eq!(sanitize_title("  hello, world!  "), "hello_world");
        assert_eq!(sanitize_title("a/b\\c:d"), "abcd");
    }

    #[test]
    fn test_sanitize_title_keeps_unicode_letters() {
        assert_eq!(sanitize_title("купить молоко"), "купить_молоко");
    }

    #[test]
    fn test_sanitize_title_fallback() {
        assert_eq!(sanitize_title("!!! ??? ..."), FALLBACK_TITLE);
        assert_eq!(sanitize_title(""), FALLBACK_TITLE);
    }

    #[test]
    fn test_note_filename() {
        let name = note_filename(DEFAULT_SOURCE_TAG, &fixed_time(), "buy milk\n\nand eggs");
        assert_eq!(name, "Gemini_2026-03-14_09-05_buy_milk.md");
    }

    #[test]
    fn test_write_creates_directory_and_file() {
        let dir = tempdir().unwrap();
        let inbox = dir.path().join("vault/inbox");
        let writer = NoteWriter::new(&inbox);

        let saved = writer
            .write_at("# Shopping\n\n- milk\n- eggs\n", "buy milk", &fixed_time())
            .unwrap();

        assert_eq!(saved.filename, "Gemini_2026-03-14_09-05_buy_milk.md");
        assert_eq!(saved.path, inbox.join(&saved.filename));
        assert_eq!(
            fs::read_to_string(&saved.path).unwrap(),
            "# Shopping\n\n- milk\n- eggs\n"
        );
    }

    #[test]
    fn test_write_into_existing_directory() {
        let dir = tempdir().unwrap();
        let writer = NoteWriter::new(dir.path()).with_source_tag("Inbox");

        let saved = writer.write_at("body", "title", &fixed_time()).unwrap();
        assert!(saved.filename.starts_with("Inbox_"));
        assert!(saved.path.exists());
    }

    #[test]
    fn test_write_collision_overwrites() {
        let dir = tempdir().unwrap();
        let writer = NoteWriter::new(dir.path());

        writer.write_at("first", "same", &fixed_time()).unwrap();
        let saved = writer.write_at("second", "same", &fixed_time()).unwrap();

        assert_eq!(fs::read_to_string(&saved.path).unwrap(), "second");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_utf8_content() {
        let dir = tempdir().unwrap();
        let writer = NoteWriter::new(dir.path());

        let saved = writer.write("> [!TIP]\n> Заметка ✅", "заметка").unwrap();
        assert_eq!(fs::read_to_string(&saved.path).unwrap(), "> [!TIP]\n> Заметка ✅");
    }

    #[test]
    fn test_write_reports_directory_failure() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "file").unwrap();

        let writer = NoteWriter::new(blocker.join("inbox"));
        let result = writer.write("body", "title");
        assert!(matches!(result, Err(FilesystemError::DirectoryError { .. })));
    }
}
