//! One live `notify` subscription over the workspace root.

use std::path::{Path, PathBuf};

use notify::{Event, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::classify::IgnoreRules;
use super::debouncer::Debouncer;
use super::error::WatchError;

/// Raw events buffered between the notify thread and the engine.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// An open watch session.
///
/// Owns the native watcher, the raw event channel, the ignore rules
/// computed when it was opened, and the per-path debounce table. Dropping
/// it releases the native handles; [`WatchSession::close`] additionally
/// waits for that to finish.
pub struct WatchSession {
    id: u64,
    root: PathBuf,
    pub(super) rules: IgnoreRules,
    pub(super) debouncer: Debouncer,
    pub(super) event_rx: mpsc::Receiver<notify::Result<Event>>,
    /// The underlying file watcher; `None` once closed.
    watcher: Option<notify::RecommendedWatcher>,
}

impl WatchSession {
    /// Open a recursive watch on `root`.
    ///
    /// Returns `Ok(None)` when the root is missing, so the caller can retry later.
    pub(super) fn open(
        id: u64,
        root: &Path,
        rules: IgnoreRules,
        debounce_ms: u64,
    ) -> Result<Option<Self>, WatchError> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // Receiver gone means the session is closing
            let _ = tx.blocking_send(res);
        })?;

        if let Err(e) = watcher.watch(root, RecursiveMode::Recursive) {
            if is_missing_path(&e) {
                tracing::warn!("[watcher] workspace root {} unavailable: {e}", root.display());
                return Ok(None);
            }
            return Err(WatchError::PathWatchFailed {
                path: root.to_path_buf(),
                reason: e.to_string(),
            });
        }

        Ok(Some(Self {
            id,
            root: root.to_path_buf(),
            rules,
            debouncer: Debouncer::new(debounce_ms),
            event_rx: rx,
            watcher: Some(watcher),
        }))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn rules(&self) -> &IgnoreRules {
        &self.rules
    }

    /// Stop watching and wait for the native watcher to shut down.
    ///
    /// Queued events are discarded; none are delivered after this returns.
    pub async fn close(mut self) {
        // Close the channel first so a notify thread blocked on a full
        // channel is released before the watcher is torn down
        self.event_rx.close();
        let dropped = self.debouncer.pending_count();
        self.debouncer.clear();
        if dropped > 0 {
            crate::debug_event!("watcher", "discarded", "{dropped} pending events");
        }

        if let Some(watcher) = self.watcher.take() {
            if let Err(e) = tokio::task::spawn_blocking(move || drop(watcher)).await {
                tracing::warn!("[watcher] session {} shutdown failed: {e}", self.id);
            }
        }
        crate::debug_event!("watcher", "closed", "session {}", self.id);
    }
}

/// True for errors meaning the watched path does not exist (any more).
pub(super) fn is_missing_path(e: &notify::Error) -> bool {
    match &e.kind {
        notify::ErrorKind::PathNotFound | notify::ErrorKind::WatchNotFound => true,
        notify::ErrorKind::Io(io) => io.kind() == std::io::ErrorKind::NotFound,
        _ => false,
    }
}
