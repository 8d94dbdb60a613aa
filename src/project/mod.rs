//! UI5 projects and the registry that tracks them.
//!
//! A project is identified by its root directory: the directory that
//! directly contains a `manifest.json`. Registered roots are always
//! disjoint subtrees; nothing is registered inside another project.

mod registry;
pub mod scan;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;

use crate::watcher::WatchError;

pub use registry::WorkspaceProjects;

/// One discovered application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    /// Resolved absolute root directory.
    pub root: PathBuf,
    /// Manifest that marks the root.
    pub manifest: PathBuf,
    /// `sap.app.id` from the manifest, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    /// `sap.app.type` from the manifest, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_type: Option<String>,
}

impl Project {
    /// Display name: app id if known, else the root's directory name.
    pub fn name(&self) -> String {
        self.app_id.clone().unwrap_or_else(|| {
            self.root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.root.display().to_string())
        })
    }

    /// True if `path` is this project's root or lies beneath it.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }
}

/// Set of known projects keyed by root.
///
/// Mutations are expected from one serialized context (the watch engine or
/// the startup scan); implementations that are shared more widely must
/// serialize internally.
#[async_trait]
pub trait ProjectRegistry: Send + Sync {
    /// Register the project whose manifest is at `manifest`.
    ///
    /// Returns `Ok(None)` when the candidate is rejected: already known,
    /// overlapping an existing root, or not a valid manifest.
    async fn add_project(&self, manifest: &Path) -> Result<Option<Project>, WatchError>;

    /// Unregister the project whose manifest is at `manifest`, if any.
    async fn remove_project_by_manifest(
        &self,
        manifest: &Path,
    ) -> Result<Option<Project>, WatchError>;

    /// Unregister a specific project.
    async fn remove_project(&self, project: &Project) -> Result<(), WatchError>;

    /// Project whose root is exactly `path`.
    async fn find_by_root(&self, path: &Path) -> Option<Project>;

    /// Project whose root is `path` or an ancestor of it.
    async fn find_containing(&self, path: &Path) -> Option<Project>;

    /// All registered projects.
    async fn all_projects(&self) -> Vec<Project>;
}
