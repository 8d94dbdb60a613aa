//! Workspace watch engine for project discovery.
//!
//! One `notify` session watches the whole workspace. Raw events are
//! translated into four logical kinds, filtered through the session's
//! ignore rules, debounced per path, and dispatched to lifecycle handlers
//! that update the project registry and fire notifications.
//!
//! # Architecture
//!
//! ```text
//! notify::RecommendedWatcher (WatchSession)
//!         |  raw events
//!     translate -> resolve_path -> IgnoreRules -> Debouncer
//!         |  WatchEvent { Added | Changed | Removed | DirectoryRemoved }
//!     WatchEngine::handle
//!         |                    |
//!  ProjectRegistry         Notifier
//! ```

mod classify;
mod debouncer;
mod engine;
mod error;
mod event;
mod exclude;
mod session;

pub use classify::{
    IgnoreRules, MANIFEST_FILE, is_manifest, is_strictly_inside, manifest_root, resolve_path,
};
pub use debouncer::Debouncer;
pub use engine::{ExclusionSource, Outcome, WatchEngine, WatchEngineBuilder};
pub use error::WatchError;
pub use event::{WatchEvent, WatchEventKind, translate};
pub use exclude::Excluder;
pub use session::WatchSession;
