//! Startup scan: find every manifest already present in the workspace.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::watcher::{Excluder, is_manifest};

/// Walk `root` and return manifest paths, shallowest first.
///
/// Excluded directories are pruned rather than filtered, so large trees
/// such as `node_modules` are never descended into. Unreadable entries are
/// skipped.
pub fn discover_manifests(root: &Path, excluder: &Excluder) -> Vec<PathBuf> {
    let mut manifests: Vec<(usize, PathBuf)> = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !excluder.is_excluded(entry.path()))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                crate::debug_event!("scan", "skipped", "{e}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_manifest(entry.path()))
        .map(|entry| (entry.depth(), entry.into_path()))
        .collect();

    // Stable: equal depths keep file-name order
    manifests.sort_by_key(|(depth, _)| *depth);
    manifests.into_iter().map(|(_, path)| path).collect()
}
