//! Watch command - live project discovery.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};

use crate::config::Settings;
use crate::notifier::{NotificationBroadcaster, WorkspaceEvent};
use crate::project::{ProjectRegistry, WorkspaceProjects};
use crate::watcher::WatchEngine;

/// Delay between attempts to watch an unavailable workspace root.
const RETRY_INTERVAL: Duration = Duration::from_secs(2);

/// Run the watch command.
pub async fn run(config: Settings, path: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let root = super::workspace_root(&config, path);

    let registry = Arc::new(WorkspaceProjects::new());
    let broadcaster = Arc::new(NotificationBroadcaster::default());
    let printer = tokio::spawn(print_events(broadcaster.subscribe(), json));

    // Exclusions are re-read from the watched workspace on every (re)start
    let source_config = config.clone();
    let source_root = root.clone();
    let mut engine = WatchEngine::builder()
        .workspace_root(root.clone())
        .registry(registry.clone())
        .notifier(broadcaster.clone())
        .exclusion_source(move || super::exclusions(&source_config, &source_root))
        .debounce_ms(config.watch.debounce_ms)
        .tick_ms(config.watch.tick_ms)
        .build()?;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        // Whatever happened while unwatched is only visible on disk
        if root.is_dir() {
            registry
                .rescan(&root, &super::excluder(&config, &root))
                .await;
        }

        if !engine.start().await? {
            eprintln!(
                "Workspace root {} unavailable, retrying in {}s",
                root.display(),
                RETRY_INTERVAL.as_secs()
            );
            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(RETRY_INTERVAL) => continue,
            }
        }

        eprintln!(
            "Watching {} ({} projects). Press Ctrl-C to stop.",
            engine.workspace_root().display(),
            registry.all_projects().await.len()
        );

        tokio::select! {
            result = engine.run() => {
                if let Err(e) = result {
                    tracing::error!("[watch] session failed: {e}");
                }
                eprintln!("Watch session ended");
            }
            _ = &mut shutdown => break,
        }
    }

    engine.close().await;
    printer.abort();
    Ok(())
}

async fn print_events(mut rx: broadcast::Receiver<WorkspaceEvent>, json: bool) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                if json {
                    match serde_json::to_string(&event) {
                        Ok(line) => println!("{line}"),
                        Err(e) => tracing::warn!("[watch] cannot serialize {event:?}: {e}"),
                    }
                } else {
                    println!("{}", describe(&event));
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("[watch] output lagging, skipped {skipped} events");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn describe(event: &WorkspaceEvent) -> String {
    match event {
        WorkspaceEvent::ProjectServed { root, app_id } => match app_id {
            Some(id) => format!("serve    {} ({id})", root.display()),
            None => format!("serve    {}", root.display()),
        },
        WorkspaceEvent::VisibilityRefreshed => "refresh  visibility".to_string(),
        WorkspaceEvent::MenuContextsRefreshed => "refresh  menu contexts".to_string(),
        WorkspaceEvent::BrowserReload { path } => format!("reload   {}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let served = WorkspaceEvent::ProjectServed {
            root: PathBuf::from("/ws/app1"),
            app_id: Some("app1".to_string()),
        };
        assert_eq!(describe(&served), "serve    /ws/app1 (app1)");
        assert_eq!(
            describe(&WorkspaceEvent::BrowserReload {
                path: PathBuf::from("/ws/app1/manifest.json")
            }),
            "reload   /ws/app1/manifest.json"
        );
    }
}
