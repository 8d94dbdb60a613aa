//! Project discovery engine.
//!
//! Classifies watch events, drives project lifecycle transitions through the
//! registry, and fires notifications for every accepted transition.
//!
//! Lifecycle per candidate root:
//!
//! ```text
//!  unknown --manifest added/changed, accepted--> registered
//!  registered --manifest removed--------------> unknown
//!  registered --root directory removed--------> unknown
//!  registered --manifest changed--------------> registered (no-op)
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::Event;
use tokio::time::sleep;

use crate::notifier::Notifier;
use crate::project::scan::discover_manifests;
use crate::project::{Project, ProjectRegistry};

use super::classify::{IgnoreRules, is_manifest, manifest_root, resolve_path};
use super::error::WatchError;
use super::event::{WatchEvent, WatchEventKind, translate};
use super::exclude::Excluder;
use super::session::{WatchSession, is_missing_path};

/// Supplies the exclusion globs; called on every [`WatchEngine::start`].
pub type ExclusionSource = Arc<dyn Fn() -> Vec<String> + Send + Sync>;

/// Result of handling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Not a manifest, or not a project root.
    Ignored,
    /// New project accepted and all notifications sent.
    Registered(Project),
    /// Registry refused the candidate; nothing was notified.
    Rejected,
    /// Manifest changed under an already registered root.
    AlreadyRegistered,
    /// Removal handled; carries the project that went away, if any.
    Unregistered(Option<Project>),
}

impl Outcome {
    /// True if the registry's root set changed.
    pub fn changed_registry(&self) -> bool {
        matches!(self, Outcome::Registered(_) | Outcome::Unregistered(Some(_)))
    }
}

enum SessionInput {
    Raw(notify::Result<Event>),
    Closed,
    Tick,
}

/// Watches a workspace and keeps the project registry in sync with the
/// manifests on disk.
pub struct WatchEngine {
    workspace_root: PathBuf,
    registry: Arc<dyn ProjectRegistry>,
    notifier: Arc<dyn Notifier>,
    exclusions: ExclusionSource,
    debounce_ms: u64,
    tick: Duration,
    session: Option<WatchSession>,
    sessions_opened: u64,
}

impl WatchEngine {
    /// Create a builder for configuring the engine.
    pub fn builder() -> WatchEngineBuilder {
        WatchEngineBuilder::new()
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn is_watching(&self) -> bool {
        self.session.is_some()
    }

    /// Id of the active session, if any. Ids increase with every start.
    pub fn session_id(&self) -> Option<u64> {
        self.session.as_ref().map(WatchSession::id)
    }

    /// Ignore rules of the active session.
    pub fn ignore_rules(&self) -> Option<&IgnoreRules> {
        self.session.as_ref().map(WatchSession::rules)
    }

    /// Whether the active session would suppress events for `path`.
    ///
    /// Without a session nothing is ignored.
    pub fn is_ignored(&self, path: &Path) -> bool {
        let resolved = self.resolve(path);
        self.ignore_rules()
            .is_some_and(|rules| rules.is_ignored(&resolved))
    }

    /// (Re)establish the watch session over the workspace root.
    ///
    /// Any previous session is closed first. Exclusions are re-read and the
    /// current project roots are snapshotted into the ignore rules. Returns
    /// `Ok(false)` if the workspace root is currently unavailable.
    pub async fn start(&mut self) -> Result<bool, WatchError> {
        self.close().await;

        if !self.workspace_root.is_dir() {
            tracing::warn!(
                "[watcher] workspace root {} not available, not watching",
                self.workspace_root.display()
            );
            return Ok(false);
        }

        let patterns = (self.exclusions)();
        let excluder = Excluder::new(&self.workspace_root, &patterns);
        let rules = IgnoreRules::new(excluder, self.project_roots().await);

        let id = self.sessions_opened + 1;
        let Some(session) =
            WatchSession::open(id, &self.workspace_root, rules, self.debounce_ms)?
        else {
            return Ok(false);
        };
        self.sessions_opened = id;

        crate::log_event!(
            "watcher",
            "started",
            "session {id} on {} ({} exclusions, {} projects)",
            self.workspace_root.display(),
            session.rules().excluder().len(),
            session.rules().roots().len()
        );
        self.session = Some(session);
        Ok(true)
    }

    /// Stop watching. No-op without a session.
    pub async fn close(&mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
            crate::log_event!("watcher", "stopped");
        }
    }

    /// Re-snapshot project roots into the live session's ignore rules.
    ///
    /// Exclusion globs are kept as they were at `start()`.
    pub async fn refresh_ignore_rules(&mut self) {
        if self.session.is_none() {
            return;
        }
        let roots = self.project_roots().await;
        if let Some(session) = self.session.as_mut() {
            session.rules = session.rules.with_roots(roots);
        }
    }

    /// Process events until the session ends.
    ///
    /// Ends when the channel closes or the workspace root disappears; both
    /// close the session. A failed transition is logged and does not stop
    /// the loop.
    pub async fn run(&mut self) -> Result<(), WatchError> {
        if self.session.is_none() {
            return Err(WatchError::NoSession);
        }

        loop {
            let Some(session) = self.session.as_mut() else {
                return Ok(());
            };

            match Self::next_input(session, self.tick).await {
                SessionInput::Raw(Ok(event)) => self.process_raw(event).await?,
                SessionInput::Raw(Err(e)) => {
                    if is_missing_path(&e) || !self.workspace_root.is_dir() {
                        tracing::warn!("[watcher] lost workspace root: {e}");
                        self.close().await;
                        return Ok(());
                    }
                    tracing::error!("[watcher] file watch error: {e}");
                }
                SessionInput::Closed => {
                    crate::debug_event!("watcher", "event channel closed");
                    self.close().await;
                    return Ok(());
                }
                SessionInput::Tick => {}
            }

            // Flushed every iteration so a steady event stream cannot starve it
            self.flush_ready().await;
        }
    }

    async fn next_input(session: &mut WatchSession, tick: Duration) -> SessionInput {
        tokio::select! {
            res = session.event_rx.recv() => match res {
                Some(res) => SessionInput::Raw(res),
                None => SessionInput::Closed,
            },
            _ = sleep(tick) => SessionInput::Tick,
        }
    }

    /// Feed one raw `notify` event through the live session.
    ///
    /// Paths are resolved and filtered through the ignore rules. Additions
    /// and changes are debounced; removals are dispatched right away.
    /// A directory that appears is walked and its manifests are added right
    /// away, shallowest first. Removal of the workspace root itself closes
    /// the session.
    pub async fn process_raw(&mut self, event: Event) -> Result<(), WatchError> {
        let root = self.workspace_root.clone();
        let Some(session) = self.session.as_mut() else {
            return Err(WatchError::NoSession);
        };

        let mut immediate = Vec::new();
        for logical in translate(&event) {
            let resolved = resolve_path(&root, &logical.path);

            if logical.kind == WatchEventKind::DirectoryRemoved && resolved == root {
                tracing::warn!("[watcher] workspace root {} removed", root.display());
                self.close().await;
                return Ok(());
            }

            if session.rules.is_ignored(&resolved) {
                crate::debug_event!("watcher", "ignored", "{} {}", logical.kind, resolved.display());
                continue;
            }

            // A directory moved or copied in arrives as one event; its files never do
            if logical.kind == WatchEventKind::Added && resolved.is_dir() {
                for manifest in discover_manifests(&resolved, session.rules.excluder()) {
                    if session.rules.is_ignored(&manifest) {
                        continue;
                    }
                    crate::debug_event!("watcher", "found", "{} in new directory", manifest.display());
                    session.debouncer.remove(&manifest);
                    immediate.push(WatchEvent::added(manifest));
                }
                continue;
            }

            if logical.kind.is_removal() {
                session.debouncer.remove(&resolved);
                immediate.push(WatchEvent::new(logical.kind, resolved));
            } else {
                session.debouncer.record(resolved, logical.kind);
            }
        }

        for event in immediate {
            self.dispatch(event).await;
        }
        Ok(())
    }

    /// Dispatch every debounced event whose quiet period has elapsed.
    pub async fn flush_ready(&mut self) {
        let ready = match self.session.as_mut() {
            Some(session) if session.debouncer.has_pending() => session.debouncer.take_ready(),
            _ => return,
        };
        for event in ready {
            self.dispatch(event).await;
        }
    }

    /// Handle one event inside the session loop: failures are reported,
    /// and the ignore rules follow any change to the registry.
    async fn dispatch(&mut self, event: WatchEvent) {
        match self.handle(&event).await {
            Ok(outcome) => {
                if outcome.changed_registry() {
                    self.refresh_ignore_rules().await;
                }
            }
            Err(e) => {
                tracing::error!(
                    "[watcher] {} {} failed: {e}",
                    event.kind,
                    event.path.display()
                );
                // The registry may have changed before the failure
                self.refresh_ignore_rules().await;
            }
        }
    }

    /// Handle a single logical event.
    ///
    /// This is the entry point for synthetic events; it does not consult
    /// the ignore rules.
    pub async fn handle(&self, event: &WatchEvent) -> Result<Outcome, WatchError> {
        match event.kind {
            WatchEventKind::Added => self.on_file_added(&event.path).await,
            WatchEventKind::Changed => self.on_file_changed(&event.path).await,
            WatchEventKind::Removed => self.on_file_removed(&event.path).await,
            WatchEventKind::DirectoryRemoved => self.on_directory_removed(&event.path).await,
        }
    }

    /// A file appeared. Manifests are offered to the registry.
    pub async fn on_file_added(&self, path: &Path) -> Result<Outcome, WatchError> {
        let resolved = self.resolve(path);
        if !is_manifest(&resolved) {
            return Ok(Outcome::Ignored);
        }
        self.register(&resolved).await
    }

    /// A file changed. A manifest without a registered root is treated as new.
    pub async fn on_file_changed(&self, path: &Path) -> Result<Outcome, WatchError> {
        let resolved = self.resolve(path);
        if !is_manifest(&resolved) {
            return Ok(Outcome::Ignored);
        }
        let Some(root) = manifest_root(&resolved) else {
            return Ok(Outcome::Ignored);
        };

        if self.registry.find_by_root(root).await.is_some() {
            crate::debug_event!("watcher", "manifest changed", "{}", resolved.display());
            return Ok(Outcome::AlreadyRegistered);
        }

        crate::debug_event!("watcher", "unregistered manifest changed", "{}", resolved.display());
        self.register(&resolved).await
    }

    /// A file went away. Removing a manifest unregisters its project.
    ///
    /// Notifications are sent even if no project was registered there.
    pub async fn on_file_removed(&self, path: &Path) -> Result<Outcome, WatchError> {
        let resolved = self.resolve(path);
        if !is_manifest(&resolved) {
            return Ok(Outcome::Ignored);
        }

        let removed = self.registry.remove_project_by_manifest(&resolved).await?;
        if let Some(project) = &removed {
            crate::log_event!("watcher", "unregistered", "{}", project.root.display());
        }

        self.notifier.refresh_visibility().await?;
        self.notifier.reload_browser(&resolved).await?;
        Ok(Outcome::Unregistered(removed))
    }

    /// A directory went away. Only an exact project root unregisters.
    pub async fn on_directory_removed(&self, path: &Path) -> Result<Outcome, WatchError> {
        let resolved = self.resolve(path);
        let Some(project) = self.registry.find_by_root(&resolved).await else {
            return Ok(Outcome::Ignored);
        };

        self.registry.remove_project(&project).await?;
        crate::log_event!("watcher", "root removed", "{}", project.root.display());

        self.notifier.reload_browser(&resolved).await?;
        Ok(Outcome::Unregistered(Some(project)))
    }

    async fn register(&self, manifest: &Path) -> Result<Outcome, WatchError> {
        let Some(project) = self.registry.add_project(manifest).await? else {
            crate::debug_event!("watcher", "rejected", "{}", manifest.display());
            return Ok(Outcome::Rejected);
        };
        crate::log_event!("watcher", "registered", "{}", project.root.display());

        self.notifier.serve_project(&project).await?;
        self.notifier.refresh_visibility().await?;
        self.notifier.refresh_menu_contexts().await?;
        self.notifier.reload_browser(manifest).await?;
        Ok(Outcome::Registered(project))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        resolve_path(&self.workspace_root, path)
    }

    async fn project_roots(&self) -> Vec<PathBuf> {
        self.registry
            .all_projects()
            .await
            .into_iter()
            .map(|p| p.root)
            .collect()
    }
}

/// Builder for constructing a WatchEngine.
pub struct WatchEngineBuilder {
    workspace_root: Option<PathBuf>,
    registry: Option<Arc<dyn ProjectRegistry>>,
    notifier: Option<Arc<dyn Notifier>>,
    exclusions: ExclusionSource,
    debounce_ms: u64,
    tick_ms: u64,
}

impl WatchEngineBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            workspace_root: None,
            registry: None,
            notifier: None,
            exclusions: Arc::new(Vec::<String>::new),
            debounce_ms: 300,
            tick_ms: 100,
        }
    }

    /// Set the workspace root.
    pub fn workspace_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(path.into());
        self
    }

    /// Set the project registry.
    pub fn registry(mut self, registry: Arc<dyn ProjectRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the notification sinks.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Use a fixed list of exclusion globs.
    pub fn exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclusions = Arc::new(move || patterns.clone());
        self
    }

    /// Re-read exclusion globs from `source` on every start.
    pub fn exclusion_source(
        mut self,
        source: impl Fn() -> Vec<String> + Send + Sync + 'static,
    ) -> Self {
        self.exclusions = Arc::new(source);
        self
    }

    /// Set the debounce duration in milliseconds.
    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Set how often pending debounced events are checked, in milliseconds.
    pub fn tick_ms(mut self, ms: u64) -> Self {
        self.tick_ms = ms.max(1);
        self
    }

    /// Build the WatchEngine. No session is opened until `start()`.
    pub fn build(self) -> Result<WatchEngine, WatchError> {
        let registry = self.registry.ok_or_else(|| WatchError::InitFailed {
            reason: "Project registry is required".to_string(),
        })?;

        let notifier = self.notifier.ok_or_else(|| WatchError::InitFailed {
            reason: "Notifier is required".to_string(),
        })?;

        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        let root = resolve_path(&cwd, &self.workspace_root.unwrap_or_else(|| cwd.clone()));
        // Match the form notify reports paths in (symlinked temp dirs etc.)
        let workspace_root = std::fs::canonicalize(&root).unwrap_or(root);

        Ok(WatchEngine {
            workspace_root,
            registry,
            notifier,
            exclusions: self.exclusions,
            debounce_ms: self.debounce_ms,
            tick: Duration::from_millis(self.tick_ms),
            session: None,
            sessions_opened: 0,
        })
    }
}

impl Default for WatchEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::NotificationBroadcaster;
    use crate::project::WorkspaceProjects;

    fn project(root: &str) -> Project {
        Project {
            root: PathBuf::from(root),
            manifest: PathBuf::from(root).join("manifest.json"),
            app_id: None,
            app_type: None,
        }
    }

    #[test]
    fn test_changed_registry() {
        assert!(Outcome::Registered(project("/ws/a")).changed_registry());
        assert!(Outcome::Unregistered(Some(project("/ws/a"))).changed_registry());
        assert!(!Outcome::Unregistered(None).changed_registry());
        assert!(!Outcome::Rejected.changed_registry());
        assert!(!Outcome::AlreadyRegistered.changed_registry());
        assert!(!Outcome::Ignored.changed_registry());
    }

    #[tokio::test]
    async fn test_no_session_is_an_error() {
        let mut engine = WatchEngine::builder()
            .workspace_root("/nonexistent/ui5-watch-root")
            .registry(Arc::new(WorkspaceProjects::new()))
            .notifier(Arc::new(NotificationBroadcaster::default()))
            .build()
            .unwrap();

        assert!(!engine.is_watching());
        assert!(!engine.is_ignored(Path::new("anything")));
        let event = Event::new(notify::EventKind::Any);
        assert!(matches!(engine.process_raw(event).await, Err(WatchError::NoSession)));
        assert!(matches!(engine.run().await, Err(WatchError::NoSession)));
    }
}
