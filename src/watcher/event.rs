//! Logical watch events and their translation from raw `notify` events.

use std::fmt;
use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind};
use serde::Serialize;

use super::classify::is_manifest;

/// The four event kinds discovery reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchEventKind {
    Added,
    Changed,
    Removed,
    DirectoryRemoved,
}

impl WatchEventKind {
    /// Removals bypass debouncing.
    pub fn is_removal(self) -> bool {
        matches!(self, Self::Removed | Self::DirectoryRemoved)
    }
}

impl fmt::Display for WatchEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Added => "added",
            Self::Changed => "changed",
            Self::Removed => "removed",
            Self::DirectoryRemoved => "directory removed",
        };
        f.write_str(name)
    }
}

/// One logical event for one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub path: PathBuf,
}

impl WatchEvent {
    pub fn new(kind: WatchEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    pub fn added(path: impl Into<PathBuf>) -> Self {
        Self::new(WatchEventKind::Added, path)
    }

    pub fn changed(path: impl Into<PathBuf>) -> Self {
        Self::new(WatchEventKind::Changed, path)
    }

    pub fn removed(path: impl Into<PathBuf>) -> Self {
        Self::new(WatchEventKind::Removed, path)
    }

    pub fn directory_removed(path: impl Into<PathBuf>) -> Self {
        Self::new(WatchEventKind::DirectoryRemoved, path)
    }
}

/// Removal kind for a path that no longer exists and whose type is unknown.
///
/// Only manifest removals and project-root removals matter downstream, so a
/// manifest-named path is treated as a file and anything else as a directory.
fn unknown_removal(path: &Path) -> WatchEventKind {
    if is_manifest(path) {
        WatchEventKind::Removed
    } else {
        WatchEventKind::DirectoryRemoved
    }
}

/// Translate a raw `notify` event into logical events, in path order.
///
/// Access and unclassified events produce nothing.
pub fn translate(event: &Event) -> Vec<WatchEvent> {
    let paths = &event.paths;
    let each = |kind: WatchEventKind| -> Vec<WatchEvent> {
        paths.iter().map(|p| WatchEvent::new(kind, p.clone())).collect()
    };

    match event.kind {
        // Directories too: the engine walks them for manifests
        EventKind::Create(_) => each(WatchEventKind::Added),

        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::To => each(WatchEventKind::Added),
            RenameMode::From => paths
                .iter()
                .map(|p| WatchEvent::new(unknown_removal(p), p.clone()))
                .collect(),
            RenameMode::Both if paths.len() == 2 => vec![
                WatchEvent::new(unknown_removal(&paths[0]), paths[0].clone()),
                WatchEvent::added(paths[1].clone()),
            ],
            _ => paths
                .iter()
                .map(|p| {
                    if p.exists() {
                        WatchEvent::added(p.clone())
                    } else {
                        WatchEvent::new(unknown_removal(p), p.clone())
                    }
                })
                .collect(),
        },
        EventKind::Modify(_) => each(WatchEventKind::Changed),

        EventKind::Remove(RemoveKind::File) => each(WatchEventKind::Removed),
        EventKind::Remove(RemoveKind::Folder) => each(WatchEventKind::DirectoryRemoved),
        EventKind::Remove(_) => paths
            .iter()
            .map(|p| WatchEvent::new(unknown_removal(p), p.clone()))
            .collect(),

        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}
