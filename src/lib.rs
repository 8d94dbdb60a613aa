//! Live discovery of UI5 application projects.
//!
//! Watches a workspace for `manifest.json` files appearing, changing, or
//! disappearing, keeps a registry of disjoint project roots in sync, and
//! notifies the dev server, browsers and UI on every transition.

pub mod cli;
pub mod config;
pub mod logging;
pub mod notifier;
pub mod project;
pub mod watcher;

pub use config::Settings;
pub use notifier::{NotificationBroadcaster, Notifier, WorkspaceEvent};
pub use project::{Project, ProjectRegistry, WorkspaceProjects};
pub use watcher::{Outcome, WatchEngine, WatchError, WatchEvent, WatchEventKind};
