//! In-memory project registry enforcing disjoint roots.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::scan::discover_manifests;
use super::{Project, ProjectRegistry};
use crate::watcher::{Excluder, WatchError, is_manifest, manifest_root};

/// Registry of projects found in one workspace.
///
/// The manifest is read and must be a JSON object; `sap.app.id` and
/// `sap.app.type` are picked up when present.
#[derive(Debug, Default)]
pub struct WorkspaceProjects {
    projects: RwLock<BTreeMap<PathBuf, Project>>,
}

impl WorkspaceProjects {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.projects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.projects.read().await.is_empty()
    }

    /// Register every manifest under `root`, outermost first.
    ///
    /// Returns the projects that were accepted.
    pub async fn scan(&self, root: &Path, excluder: &Excluder) -> Vec<Project> {
        let mut accepted = Vec::new();
        for manifest in discover_manifests(root, excluder) {
            match self.add_project(&manifest).await {
                Ok(Some(project)) => accepted.push(project),
                Ok(None) => {}
                Err(e) => tracing::warn!("[registry] scan skipped {}: {e}", manifest.display()),
            }
        }
        crate::log_event!("registry", "scanned", "{} projects", accepted.len());
        accepted
    }

    /// Forget every project and scan `root` again.
    ///
    /// Roots that vanished without per-manifest removals are dropped, and
    /// manifests that appeared while nothing was watching are picked up.
    pub async fn rescan(&self, root: &Path, excluder: &Excluder) -> Vec<Project> {
        let dropped = {
            let mut projects = self.projects.write().await;
            let count = projects.len();
            projects.clear();
            count
        };
        crate::debug_event!("registry", "rescan", "dropped {dropped} projects");
        self.scan(root, excluder).await
    }

    /// Existing root that is an ancestor or descendant of `root`.
    fn overlapping<'a>(projects: &'a BTreeMap<PathBuf, Project>, root: &Path) -> Option<&'a Path> {
        projects
            .keys()
            .find(|existing| root.starts_with(existing) || existing.starts_with(root))
            .map(PathBuf::as_path)
    }
}

/// `sap.app.id` and `sap.app.type` of a readable manifest.
type AppFields = (Option<String>, Option<String>);

/// Read a manifest and extract the `sap.app` fields.
///
/// `Ok(Err(reason))` means the candidate is unusable (gone, not text, not a
/// JSON object) and should be rejected. Any other I/O failure is an error.
async fn read_manifest(manifest: &Path) -> Result<Result<AppFields, String>, WatchError> {
    let content = match tokio::fs::read_to_string(manifest).await {
        Ok(content) => content,
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::InvalidData) => {
            return Ok(Err(format!("unreadable: {e}")));
        }
        Err(e) => {
            return Err(WatchError::RegistryFailed {
                path: manifest.to_path_buf(),
                reason: e.to_string(),
            });
        }
    };

    let json: Value = match serde_json::from_str(&content) {
        Ok(json) => json,
        Err(e) => return Ok(Err(format!("invalid JSON: {e}"))),
    };
    if !json.is_object() {
        return Ok(Err("not a JSON object".to_string()));
    }

    let field = |name: &str| {
        json.get("sap.app")
            .and_then(|app| app.get(name))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    Ok(Ok((field("id"), field("type"))))
}

#[async_trait]
impl ProjectRegistry for WorkspaceProjects {
    async fn add_project(&self, manifest: &Path) -> Result<Option<Project>, WatchError> {
        let Some(root) = manifest_root(manifest).filter(|_| is_manifest(manifest)) else {
            crate::debug_event!("registry", "rejected", "{} is not a manifest", manifest.display());
            return Ok(None);
        };
        if !root.is_absolute() {
            crate::debug_event!("registry", "rejected", "relative root {}", root.display());
            return Ok(None);
        }

        // Cheap checks first; the manifest is only read for a viable root
        if let Some(existing) = Self::overlapping(&*self.projects.read().await, root) {
            crate::debug_event!(
                "registry",
                "rejected",
                "{} overlaps {}",
                root.display(),
                existing.display()
            );
            return Ok(None);
        }

        let (app_id, app_type) = match read_manifest(manifest).await? {
            Ok(fields) => fields,
            Err(reason) => {
                crate::debug_event!("registry", "rejected", "{}: {reason}", manifest.display());
                return Ok(None);
            }
        };

        let mut projects = self.projects.write().await;
        // Re-check under the write lock
        if Self::overlapping(&projects, root).is_some() {
            return Ok(None);
        }

        let project = Project {
            root: root.to_path_buf(),
            manifest: manifest.to_path_buf(),
            app_id,
            app_type,
        };
        projects.insert(project.root.clone(), project.clone());
        crate::log_event!("registry", "added", "{} ({})", project.name(), root.display());
        Ok(Some(project))
    }

    async fn remove_project_by_manifest(
        &self,
        manifest: &Path,
    ) -> Result<Option<Project>, WatchError> {
        let Some(root) = manifest_root(manifest) else {
            return Ok(None);
        };
        let removed = self.projects.write().await.remove(root);
        if let Some(project) = &removed {
            crate::log_event!("registry", "removed", "{}", project.root.display());
        }
        Ok(removed)
    }

    async fn remove_project(&self, project: &Project) -> Result<(), WatchError> {
        if self.projects.write().await.remove(&project.root).is_some() {
            crate::log_event!("registry", "removed", "{}", project.root.display());
        }
        Ok(())
    }

    async fn find_by_root(&self, path: &Path) -> Option<Project> {
        self.projects.read().await.get(path).cloned()
    }

    async fn find_containing(&self, path: &Path) -> Option<Project> {
        self.projects
            .read()
            .await
            .values()
            .find(|project| project.contains(path))
            .cloned()
    }

    async fn all_projects(&self) -> Vec<Project> {
        self.projects.read().await.values().cloned().collect()
    }
}
