//! Pure path classification: manifest detection, resolution, and the
//! ignore predicate applied to every raw event of a watch session.

use std::path::{Component, Path, PathBuf};

use super::exclude::Excluder;

/// File whose presence marks a directory as a project root.
pub const MANIFEST_FILE: &str = "manifest.json";

/// True iff the last path segment is exactly `manifest.json`.
///
/// Case-sensitive, no filesystem access.
pub fn is_manifest(path: &Path) -> bool {
    path.file_name().is_some_and(|name| name == MANIFEST_FILE)
}

/// Project root a manifest path would register.
pub fn manifest_root(manifest: &Path) -> Option<&Path> {
    manifest.parent().filter(|p| !p.as_os_str().is_empty())
}

/// Resolve `path` against `root` and normalize it lexically.
///
/// Relative paths are joined onto `root`; `.` segments are dropped and `..`
/// pops the previous segment. The filesystem is never consulted, so paths
/// that no longer exist (deleted files) resolve the same way.
pub fn resolve_path(root: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };

    let mut resolved = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root
                if !matches!(
                    resolved.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                ) {
                    resolved.pop();
                }
            }
            other => resolved.push(other.as_os_str()),
        }
    }
    resolved
}

/// True if `path` lies strictly beneath `root` (whole components only).
pub fn is_strictly_inside(path: &Path, root: &Path) -> bool {
    path != root && path.starts_with(root)
}

/// True if `path` is the manifest directly inside `root`.
fn is_root_manifest(path: &Path, root: &Path) -> bool {
    is_manifest(path) && path.parent() == Some(root)
}

/// Snapshot of everything the ignore predicate needs.
///
/// Built once per session start from the exclusion globs and the project
/// roots known at that moment; [`IgnoreRules::with_roots`] swaps in a new
/// root snapshot without re-reading the exclusions.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    excluder: Excluder,
    roots: Vec<PathBuf>,
}

impl IgnoreRules {
    pub fn new(excluder: Excluder, roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            excluder,
            roots: roots.into_iter().collect(),
        }
    }

    /// Same exclusions, new project root snapshot.
    pub fn with_roots(&self, roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self::new(self.excluder.clone(), roots)
    }

    pub fn excluder(&self) -> &Excluder {
        &self.excluder
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Decide whether events for an already-resolved path are suppressed.
    ///
    /// Exclusion globs win over everything. A project's own root is never
    /// ignored (that is how its removal is seen), nor is the manifest that
    /// defines it; anything else below the root is.
    pub fn is_ignored(&self, resolved: &Path) -> bool {
        if self.excluder.is_excluded(resolved) {
            return true;
        }
        self.roots.iter().any(|root| {
            is_strictly_inside(resolved, root) && !is_root_manifest(resolved, root)
        })
    }
}
