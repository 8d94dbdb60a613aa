//! Downstream actions fired after a project lifecycle transition.
//!
//! The watch engine only knows the [`Notifier`] trait. The bundled
//! [`NotificationBroadcaster`] turns each action into a [`WorkspaceEvent`]
//! on a broadcast channel that dev-server, livereload and UI layers can
//! subscribe to.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::project::Project;
use crate::watcher::WatchError;

/// Sinks the engine calls, in order, after a transition.
///
/// Each call is awaited before the next one so ordering is preserved; a
/// failure aborts the remaining calls for that transition only.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// (Re)serve a newly registered project.
    async fn serve_project(&self, project: &Project) -> Result<(), WatchError>;

    /// Recompute whether the UI affordances should be shown.
    async fn refresh_visibility(&self) -> Result<(), WatchError>;

    /// Recompute menu contexts.
    async fn refresh_menu_contexts(&self) -> Result<(), WatchError>;

    /// Tell connected browsers that `path` changed.
    async fn reload_browser(&self, path: &Path) -> Result<(), WatchError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkspaceEvent {
    ProjectServed {
        root: PathBuf,
        #[serde(skip_serializing_if = "Option::is_none")]
        app_id: Option<String>,
    },
    VisibilityRefreshed,
    MenuContextsRefreshed,
    BrowserReload {
        path: PathBuf,
    },
}

/// Broadcasts workspace events to any number of subscribers.
#[derive(Clone)]
pub struct NotificationBroadcaster {
    sender: broadcast::Sender<WorkspaceEvent>,
}

impl NotificationBroadcaster {
    /// Create a new broadcaster with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Send an event to all subscribers
    pub fn send(&self, event: WorkspaceEvent) {
        match self.sender.send(event.clone()) {
            Ok(count) => {
                crate::debug_event!("broadcast", "sent", "{event:?} to {count} subscribers");
            }
            Err(_) => {
                // No receivers, this is fine
                crate::debug_event!("broadcast", "dropped", "no subscribers for {event:?}");
            }
        }
    }

    /// Subscribe to receive events
    pub fn subscribe(&self) -> broadcast::Receiver<WorkspaceEvent> {
        self.sender.subscribe()
    }
}

impl Default for NotificationBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Notifier for NotificationBroadcaster {
    async fn serve_project(&self, project: &Project) -> Result<(), WatchError> {
        self.send(WorkspaceEvent::ProjectServed {
            root: project.root.clone(),
            app_id: project.app_id.clone(),
        });
        Ok(())
    }

    async fn refresh_visibility(&self) -> Result<(), WatchError> {
        self.send(WorkspaceEvent::VisibilityRefreshed);
        Ok(())
    }

    async fn refresh_menu_contexts(&self) -> Result<(), WatchError> {
        self.send(WorkspaceEvent::MenuContextsRefreshed);
        Ok(())
    }

    async fn reload_browser(&self, path: &Path) -> Result<(), WatchError> {
        self.send(WorkspaceEvent::BrowserReload {
            path: path.to_path_buf(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_to_subscriber() {
        let broadcaster = NotificationBroadcaster::new(8);
        let mut rx = broadcaster.subscribe();

        broadcaster.refresh_visibility().await.unwrap();
        broadcaster
            .reload_browser(Path::new("/ws/app1/manifest.json"))
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap(), WorkspaceEvent::VisibilityRefreshed);
        assert_eq!(
            rx.recv().await.unwrap(),
            WorkspaceEvent::BrowserReload {
                path: PathBuf::from("/ws/app1/manifest.json")
            }
        );
    }

    #[tokio::test]
    async fn test_send_without_subscribers_is_ok() {
        let broadcaster = NotificationBroadcaster::default();
        assert!(broadcaster.refresh_menu_contexts().await.is_ok());
    }

    #[test]
    fn test_event_json_shape() {
        let event = WorkspaceEvent::ProjectServed {
            root: PathBuf::from("/ws/app1"),
            app_id: Some("com.acme.app1".to_string()),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "project_served");
        assert_eq!(json["root"], "/ws/app1");
        assert_eq!(json["app_id"], "com.acme.app1");

        let json = serde_json::to_value(WorkspaceEvent::VisibilityRefreshed).unwrap();
        assert_eq!(json, serde_json::json!({"event": "visibility_refreshed"}));
    }
}
