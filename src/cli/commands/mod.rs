//! Command implementations for the CLI.
//!
//! Each command is implemented in its own module.

pub mod init;
pub mod scan;
pub mod watch;

use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::watcher::Excluder;

/// Workspace root from the CLI argument, else from settings.
pub(crate) fn workspace_root(config: &Settings, path: Option<PathBuf>) -> PathBuf {
    let root = path.unwrap_or_else(|| config.resolved_workspace_root());
    std::fs::canonicalize(&root).unwrap_or(root)
}

/// Exclusion globs configured for `root`, which need not be the current
/// directory. Falls back to `config` if the workspace settings are broken.
pub(crate) fn exclusions(config: &Settings, root: &Path) -> Vec<String> {
    match Settings::load_for(root) {
        Ok(settings) => settings.watch.exclude,
        Err(e) => {
            tracing::warn!("[config] cannot load settings for {}: {e}", root.display());
            config.watch.exclude.clone()
        }
    }
}

pub(crate) fn excluder(config: &Settings, root: &Path) -> Excluder {
    Excluder::new(root, &exclusions(config, root))
}
