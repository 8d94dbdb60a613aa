//! Per-path debouncing of watch events.
//!
//! Editors tend to write a file several times in quick succession (save,
//! format, auto-save). Bursts for the same path collapse into one logical
//! event that fires once the path has been quiet for the configured duration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::event::{WatchEvent, WatchEventKind};

#[derive(Debug, Clone, Copy)]
struct Pending {
    kind: WatchEventKind,
    last_seen: Instant,
}

/// Debounces watch events by path.
#[derive(Debug)]
pub struct Debouncer {
    /// Pending events: path -> coalesced kind and last event time.
    pending: HashMap<PathBuf, Pending>,
    /// How long a path must be quiet before its event fires.
    duration: Duration,
}

impl Debouncer {
    /// Create a new debouncer with the given duration in milliseconds.
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            pending: HashMap::new(),
            duration: Duration::from_millis(debounce_ms),
        }
    }

    /// Record an event, resetting the timer for its path.
    ///
    /// An add followed by changes stays an add; otherwise the latest kind wins.
    pub fn record(&mut self, path: PathBuf, kind: WatchEventKind) {
        self.record_at(path, kind, Instant::now());
    }

    fn record_at(&mut self, path: PathBuf, kind: WatchEventKind, now: Instant) {
        let kind = match self.pending.get(&path) {
            Some(prev)
                if prev.kind == WatchEventKind::Added && kind == WatchEventKind::Changed =>
            {
                WatchEventKind::Added
            }
            _ => kind,
        };
        self.pending.insert(
            path,
            Pending {
                kind,
                last_seen: now,
            },
        );
    }

    /// Drop a pending event (e.g. the path was just removed).
    pub fn remove(&mut self, path: &Path) -> Option<WatchEventKind> {
        self.pending.remove(path).map(|p| p.kind)
    }

    /// Take all events that have been quiet for the debounce duration,
    /// oldest first.
    pub fn take_ready(&mut self) -> Vec<WatchEvent> {
        self.take_ready_at(Instant::now())
    }

    fn take_ready_at(&mut self, now: Instant) -> Vec<WatchEvent> {
        let mut ready = Vec::new();

        self.pending.retain(|path, pending| {
            if now.duration_since(pending.last_seen) >= self.duration {
                ready.push((pending.last_seen, WatchEvent::new(pending.kind, path.clone())));
                false
            } else {
                true
            }
        });

        ready.sort_by_key(|(at, _)| *at);
        ready.into_iter().map(|(_, event)| event).collect()
    }

    /// Check if there are any pending events.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_debouncer_basic() {
        let mut debouncer = Debouncer::new(50);
        let start = Instant::now();

        let path = PathBuf::from("/ws/app1/manifest.json");
        debouncer.record_at(path.clone(), WatchEventKind::Added, start);

        assert!(debouncer.take_ready_at(start + ms(10)).is_empty());
        assert!(debouncer.has_pending());

        let ready = debouncer.take_ready_at(start + ms(60));
        assert_eq!(ready, vec![WatchEvent::added(path)]);
        assert!(!debouncer.has_pending());
    }

    #[test]
    fn test_debouncer_resets_on_new_event() {
        let mut debouncer = Debouncer::new(50);
        let start = Instant::now();
        let path = PathBuf::from("/ws/app1/manifest.json");

        debouncer.record_at(path.clone(), WatchEventKind::Changed, start);
        debouncer.record_at(path.clone(), WatchEventKind::Changed, start + ms(30));

        // 60ms after the first, but only 30ms after the second
        assert!(debouncer.take_ready_at(start + ms(60)).is_empty());

        let ready = debouncer.take_ready_at(start + ms(85));
        assert_eq!(ready.len(), 1);
    }

    #[test]
    fn test_added_then_changed_stays_added() {
        let mut debouncer = Debouncer::new(0);
        let path = PathBuf::from("/ws/app1/manifest.json");

        debouncer.record(path.clone(), WatchEventKind::Added);
        debouncer.record(path.clone(), WatchEventKind::Changed);
        debouncer.record(path.clone(), WatchEventKind::Changed);

        assert_eq!(debouncer.pending_count(), 1);
        assert_eq!(debouncer.take_ready(), vec![WatchEvent::added(path)]);
    }

    #[test]
    fn test_changed_then_added_is_added() {
        let mut debouncer = Debouncer::new(0);
        let path = PathBuf::from("/ws/app1/manifest.json");

        debouncer.record(path.clone(), WatchEventKind::Changed);
        debouncer.record(path.clone(), WatchEventKind::Added);

        assert_eq!(debouncer.take_ready(), vec![WatchEvent::added(path)]);
    }

    #[test]
    fn test_ready_in_arrival_order() {
        let mut debouncer = Debouncer::new(50);
        let start = Instant::now();

        debouncer.record_at(PathBuf::from("/ws/b"), WatchEventKind::Added, start + ms(5));
        debouncer.record_at(PathBuf::from("/ws/a"), WatchEventKind::Added, start);
        debouncer.record_at(PathBuf::from("/ws/c"), WatchEventKind::Added, start + ms(40));

        let ready = debouncer.take_ready_at(start + ms(60));
        let paths: Vec<_> = ready.iter().map(|e| e.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("/ws/a"), PathBuf::from("/ws/b")]);
        assert_eq!(debouncer.pending_count(), 1);
    }

    #[test]
    fn test_debouncer_remove() {
        let mut debouncer = Debouncer::new(50);
        let path = PathBuf::from("/ws/app1/manifest.json");

        debouncer.record(path.clone(), WatchEventKind::Added);
        assert_eq!(debouncer.remove(&path), Some(WatchEventKind::Added));
        assert!(!debouncer.has_pending());
        assert_eq!(debouncer.remove(&path), None);
    }
}
