//! Error types for the watch engine.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from watcher operations.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("Project registry failed for {path}: {reason}")]
    RegistryFailed { path: PathBuf, reason: String },

    #[error("Notification '{action}' failed: {reason}")]
    NotifyFailed { action: String, reason: String },

    #[error("No active watch session")]
    NoSession,
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}
