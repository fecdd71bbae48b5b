//! End-to-end tests: debounce buffer feeding the note pipeline.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use notebox_core::{
    DebounceBuffer, FormattingError, NoteFormatter, NotePipeline, NoteWriter, ReportError,
    StatusMessage, StatusReporter, ACK_NOTICE,
};
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};

#[derive(Debug)]
enum Status {
    Sent(String, Instant),
    Edited(String),
}

struct ChannelReporter {
    tx: mpsc::UnboundedSender<Status>,
    next_id: AtomicI32,
}

#[async_trait]
impl StatusReporter for ChannelReporter {
    async fn send(&self, chat_id: i64, text: &str) -> Result<StatusMessage, ReportError> {
        let _ = self.tx.send(Status::Sent(text.to_string(), Instant::now()));
        Ok(StatusMessage {
            chat_id,
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst),
        })
    }

    async fn edit(&self, _message: StatusMessage, text: &str) -> Result<(), ReportError> {
        let _ = self.tx.send(Status::Edited(text.to_string()));
        Ok(())
    }
}

struct UppercaseFormatter;

#[async_trait]
impl NoteFormatter for UppercaseFormatter {
    async fn format(&self, _instruction: &str, content: &str) -> Result<String, FormattingError> {
        Ok(content.to_uppercase())
    }
}

struct OfflineFormatter;

#[async_trait]
impl NoteFormatter for OfflineFormatter {
    async fn format(&self, _instruction: &str, _content: &str) -> Result<String, FormattingError> {
        Err(FormattingError::RequestFailed("connection refused".to_string()))
    }
}

fn relay(
    formatter: Arc<dyn NoteFormatter>,
    dir: &std::path::Path,
) -> (DebounceBuffer, mpsc::UnboundedReceiver<Status>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let reporter = Arc::new(ChannelReporter {
        tx,
        next_id: AtomicI32::new(1),
    });
    let pipeline = NotePipeline::new(formatter, NoteWriter::new(dir), reporter, "instruction");
    (
        DebounceBuffer::new(Duration::from_millis(2500), Arc::new(pipeline)),
        rx,
    )
}

#[tokio::test(start_paused = true)]
async fn test_burst_becomes_one_note() {
    let dir = tempfile::tempdir().unwrap();
    let (buffer, mut rx) = relay(Arc::new(UppercaseFormatter), dir.path());
    let start = Instant::now();

    buffer.submit(1, 100, "buy milk");
    sleep(Duration::from_secs(1)).await;
    buffer.submit(1, 100, "and eggs");

    match rx.recv().await.unwrap() {
        Status::Sent(text, at) => {
            assert_eq!(text, ACK_NOTICE);
            let elapsed = at.duration_since(start);
            assert!(elapsed >= Duration::from_millis(3500));
            assert!(elapsed < Duration::from_millis(3600));
        }
        other => panic!("expected acknowledgment, got {:?}", other),
    }

    let notice = match rx.recv().await.unwrap() {
        Status::Edited(text) => text,
        other => panic!("expected edit, got {:?}", other),
    };
    assert!(notice.starts_with("✅ Note saved: `Gemini_"));
    assert!(notice.ends_with("_buy_milk.md`\n(Messages merged: 2)"));

    let files: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);
    assert_eq!(
        std::fs::read_to_string(&files[0]).unwrap(),
        "BUY MILK\n\nAND EGGS"
    );
    assert_eq!(buffer.active_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_formatter_failure_loses_only_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let (buffer, mut rx) = relay(Arc::new(OfflineFormatter), dir.path());

    buffer.submit(1, 100, "buy milk");

    assert!(matches!(rx.recv().await.unwrap(), Status::Sent(..)));
    match rx.recv().await.unwrap() {
        Status::Edited(text) => {
            assert_eq!(text, "❌ Error: API request failed: connection refused");
        }
        other => panic!("expected failure notice, got {:?}", other),
    }

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    assert_eq!(buffer.pending(1), 0);
    assert_eq!(buffer.active_sessions(), 0);

    // A new message starts a fresh session instead of replaying the failed batch.
    assert_eq!(buffer.submit(1, 100, "retry"), 1);
}
