//! Per-user debounce buffer.
//!
//! Incoming text fragments are accumulated per user. Every fragment resets a
//! quiet-period timer; when the timer runs out without new input the session
//! is drained and the joined text is handed to a [`BatchSink`] as a single
//! [`Batch`].
//!
//! Per user the state is either absent or accumulating:
//!
//! ```text
//! ABSENT --submit--> ACCUMULATING --quiet period--> ABSENT (batch emitted)
//!                      |    ^
//!                      +----+ submit (timer reset)
//! ```
//!
//! Sessions live in a [`DashMap`], so every read-modify-write happens under
//! the lock of that user's shard and users never contend on a global lock.
//! Each scheduled flush carries a generation number. `submit` aborts the
//! previous timer task and bumps the generation in the same critical section,
//! and a flush only drains a session whose generation still matches its own.
//! Once drained, a flush runs to completion; later fragments start a new
//! session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

/// Separator placed between fragments of one batch.
pub const FRAGMENT_SEPARATOR: &str = "\n\n";

/// The joined text of one completed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// User whose fragments were collected.
    pub user_id: u64,
    /// Chat to report back to.
    pub chat_id: i64,
    /// Fragments joined in arrival order.
    pub text: String,
    /// Number of fragments merged into `text`.
    pub fragment_count: usize,
}

impl Batch {
    /// Join fragments in arrival order.
    pub fn from_fragments(user_id: u64, chat_id: i64, fragments: Vec<String>) -> Self {
        Self {
            user_id,
            chat_id,
            fragment_count: fragments.len(),
            text: fragments.join(FRAGMENT_SEPARATOR),
        }
    }
}

/// Receives batches once a user's quiet period has elapsed.
#[async_trait]
pub trait BatchSink: Send + Sync + 'static {
    /// Handle one batch. Runs on the flush task of the batch's user.
    async fn handle(&self, batch: Batch);
}

/// Accumulating state for one user.
struct Session {
    chat_id: i64,
    fragments: Vec<String>,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

struct Inner {
    sessions: DashMap<u64, Session>,
    quiet_period: Duration,
    next_generation: AtomicU64,
    sink: Arc<dyn BatchSink>,
}

impl Inner {
    /// Drain the session if `generation` is still the live one and pass it on.
    async fn flush(&self, user_id: u64, generation: u64) {
        let Some((_, session)) = self
            .sessions
            .remove_if(&user_id, |_, s| s.generation == generation)
        else {
            trace!(user_id, generation, "Flush superseded or session already drained");
            return;
        };

        // The handle in the session is this task's own; dropping it detaches.
        let Session {
            chat_id, fragments, ..
        } = session;
        let batch = Batch::from_fragments(user_id, chat_id, fragments);

        info!(
            user_id,
            chat_id,
            fragments = batch.fragment_count,
            chars = batch.text.chars().count(),
            "Flushing buffered messages"
        );

        self.sink.handle(batch).await;
    }
}

/// Debounce buffer keyed by user id.
///
/// Cheap to clone; clones share the same sessions. `submit` spawns tokio
/// tasks and must be called from within a runtime.
#[derive(Clone)]
pub struct DebounceBuffer {
    inner: Arc<Inner>,
}

impl DebounceBuffer {
    /// Create a buffer flushing into `sink` after `quiet_period` of inactivity.
    pub fn new(quiet_period: Duration, sink: Arc<dyn BatchSink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                sessions: DashMap::new(),
                quiet_period,
                next_generation: AtomicU64::new(0),
                sink,
            }),
        }
    }

    /// The configured quiet period.
    pub fn quiet_period(&self) -> Duration {
        self.inner.quiet_period
    }

    /// Append a fragment for `user_id` and restart its quiet-period timer.
    ///
    /// Returns the number of fragments now pending for the user.
    pub fn submit(&self, user_id: u64, chat_id: i64, text: impl Into<String>) -> usize {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);

        let mut session = self.inner.sessions.entry(user_id).or_insert_with(|| Session {
            chat_id,
            fragments: Vec::new(),
            generation,
            timer: None,
        });

        if let Some(timer) = session.timer.take() {
            timer.abort();
        }

        session.chat_id = chat_id;
        session.fragments.push(text.into());
        session.generation = generation;
        session.timer = Some(self.schedule(user_id, generation));

        let pending = session.fragments.len();
        debug!(user_id, chat_id, pending, "Buffered message, timer reset");
        pending
    }

    /// Number of fragments currently buffered for `user_id`.
    pub fn pending(&self, user_id: u64) -> usize {
        self.inner
            .sessions
            .get(&user_id)
            .map(|s| s.fragments.len())
            .unwrap_or(0)
    }

    /// Number of users with a flush pending.
    pub fn active_sessions(&self) -> usize {
        self.inner.sessions.len()
    }

    fn schedule(&self, user_id: u64, generation: u64) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.quiet_period).await;
            inner.flush(user_id, generation).await;
        })
    }
}
