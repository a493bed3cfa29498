//! Debounced change-event queue.
//!
//! The remote store offers no change feed, so every externally visible
//! notification is synthesized locally by the provider's mutations. The queue
//! accumulates events and flushes them as one batch once no new event has
//! arrived for a short quiescent interval, so bursts like a recursive delete
//! surface as a single notification.

use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// Quiescent interval used by [`DebouncedEventQueue::new`].
pub const DEFAULT_DEBOUNCE_MS: u64 = 5;

const BROADCAST_CAPACITY: usize = 64;

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Changed,
    Deleted,
}

/// One change notification, carrying the full provider path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub kind: ChangeKind,
    pub path: String,
}

impl FileChange {
    pub fn new(kind: ChangeKind, path: impl Into<String>) -> Self {
        FileChange {
            kind,
            path: path.into(),
        }
    }
}

/// Accumulates change events and emits them in debounced batches.
///
/// Construction spawns the flush task, so a tokio runtime must be current.
pub struct DebouncedEventQueue {
    tx: mpsc::UnboundedSender<FileChange>,
    batches: broadcast::Sender<Vec<FileChange>>,
}

impl DebouncedEventQueue {
    pub fn new() -> Self {
        Self::with_debounce(Duration::from_millis(DEFAULT_DEBOUNCE_MS))
    }

    pub fn with_debounce(quiet: Duration) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<FileChange>();
        let (batches, _) = broadcast::channel(BROADCAST_CAPACITY);
        let out = batches.clone();

        tokio::spawn(async move {
            loop {
                // Block until a burst starts.
                let Some(first) = rx.recv().await else {
                    break;
                };
                let mut batch = vec![first];

                // Extend the batch until the queue goes quiet.
                loop {
                    match tokio::time::timeout(quiet, rx.recv()).await {
                        Ok(Some(event)) => batch.push(event),
                        Ok(None) => {
                            let _ = out.send(batch);
                            return;
                        }
                        Err(_) => break,
                    }
                }

                // Send fails only when no subscriber is listening.
                let _ = out.send(batch);
            }
        });

        DebouncedEventQueue { tx, batches }
    }

    /// Enqueue events for the next batch.
    pub fn enqueue(&self, events: impl IntoIterator<Item = FileChange>) {
        for event in events {
            // The flush task lives as long as this sender does.
            let _ = self.tx.send(event);
        }
    }

    /// Subscribe to flushed batches.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<FileChange>> {
        self.batches.subscribe()
    }
}

impl Default for DebouncedEventQueue {
    fn default() -> Self {
        Self::new()
    }
}
