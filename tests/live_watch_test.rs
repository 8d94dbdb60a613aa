//! End-to-end discovery through a real filesystem watch.

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::broadcast;
use tokio::time::{sleep, timeout};

use ui5_watch::project::ProjectRegistry;
use ui5_watch::watcher::Excluder;
use ui5_watch::{NotificationBroadcaster, WatchEngine, WorkspaceEvent, WorkspaceProjects};

const WAIT: Duration = Duration::from_secs(10);

struct Live {
    _dir: TempDir,
    root: PathBuf,
    registry: Arc<WorkspaceProjects>,
    events: broadcast::Receiver<WorkspaceEvent>,
    engine: WatchEngine,
}

async fn live_workspace(setup: impl FnOnce(&Path)) -> Live {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    setup(&root);

    let registry = Arc::new(WorkspaceProjects::new());
    registry.scan(&root, &Excluder::empty()).await;
    let broadcaster = Arc::new(NotificationBroadcaster::new(64));
    let events = broadcaster.subscribe();

    let mut engine = WatchEngine::builder()
        .workspace_root(root.clone())
        .registry(registry.clone())
        .notifier(broadcaster)
        .debounce_ms(50)
        .tick_ms(20)
        .build()
        .unwrap();
    assert!(engine.start().await.unwrap());

    Live {
        _dir: dir,
        root,
        registry,
        events,
        engine,
    }
}

/// Drive the engine until `script` finishes.
async fn drive(engine: &mut WatchEngine, script: impl Future<Output = ()>) {
    tokio::select! {
        result = engine.run() => panic!("session ended early: {result:?}"),
        () = script => {}
    }
    engine.close().await;
}

async fn wait_for(
    rx: &mut broadcast::Receiver<WorkspaceEvent>,
    matches: impl Fn(&WorkspaceEvent) -> bool,
) -> WorkspaceEvent {
    let next = async {
        loop {
            match rx.recv().await {
                Ok(event) if matches(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("broadcaster closed"),
            }
        }
    };
    timeout(WAIT, next).await.expect("expected event never arrived")
}

fn write_manifest(dir: &Path, id: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join("manifest.json"),
        format!(r#"{{"sap.app": {{"id": "{id}"}}}}"#),
    )
    .unwrap();
}

async fn roots(registry: &WorkspaceProjects) -> Vec<PathBuf> {
    registry
        .all_projects()
        .await
        .into_iter()
        .map(|p| p.root)
        .collect()
}

#[tokio::test]
async fn test_manifest_lifecycle_on_disk() {
    let Live {
        _dir,
        root,
        registry,
        mut events,
        mut engine,
    } = live_workspace(|_| {}).await;

    let app = root.join("app1");
    let manifest = app.join("manifest.json");
    let script = async {
        fs::create_dir_all(&app).unwrap();
        sleep(Duration::from_millis(300)).await;
        write_manifest(&app, "my.app");

        let served = wait_for(&mut events, |e| {
            matches!(e, WorkspaceEvent::ProjectServed { .. })
        })
        .await;
        assert_eq!(
            served,
            WorkspaceEvent::ProjectServed {
                root: app.clone(),
                app_id: Some("my.app".to_string()),
            }
        );
        assert!(registry.find_by_root(&app).await.is_some());

        // Let the trailing reload for the registration pass
        sleep(Duration::from_millis(200)).await;
        while events.try_recv().is_ok() {}

        fs::remove_file(&manifest).unwrap();
        let reload = wait_for(&mut events, |e| {
            matches!(e, WorkspaceEvent::BrowserReload { .. })
        })
        .await;
        assert_eq!(
            reload,
            WorkspaceEvent::BrowserReload {
                path: manifest.clone()
            }
        );
        assert!(registry.is_empty().await);
    };

    drive(&mut engine, script).await;
}

#[tokio::test]
async fn test_directory_moved_into_workspace() {
    let outside = TempDir::new().unwrap();
    write_manifest(&outside.path().join("app2"), "moved.app");

    let Live {
        _dir,
        root,
        registry,
        mut events,
        mut engine,
    } = live_workspace(|_| {}).await;

    let app2 = root.join("app2");
    let script = async {
        sleep(Duration::from_millis(200)).await;
        fs::rename(outside.path().join("app2"), &app2).unwrap();

        let served = wait_for(&mut events, |e| {
            matches!(e, WorkspaceEvent::ProjectServed { .. })
        })
        .await;
        assert_eq!(
            served,
            WorkspaceEvent::ProjectServed {
                root: app2.clone(),
                app_id: Some("moved.app".to_string()),
            }
        );
        assert_eq!(roots(&registry).await, vec![app2.clone()]);
    };

    drive(&mut engine, script).await;
}

#[tokio::test]
async fn test_renamed_root_is_rediscovered() {
    let Live {
        _dir,
        root,
        registry,
        mut events,
        mut engine,
    } = live_workspace(|root| write_manifest(&root.join("app1"), "renamed.app")).await;
    assert_eq!(roots(&registry).await, vec![root.join("app1")]);

    let app2 = root.join("app2");
    let script = async {
        sleep(Duration::from_millis(200)).await;
        fs::rename(root.join("app1"), &app2).unwrap();

        let served = wait_for(&mut events, |e| {
            matches!(e, WorkspaceEvent::ProjectServed { .. })
        })
        .await;
        assert_eq!(
            served,
            WorkspaceEvent::ProjectServed {
                root: app2.clone(),
                app_id: Some("renamed.app".to_string()),
            }
        );
        // Trailing events for the old name must not undo the registration
        sleep(Duration::from_millis(300)).await;
        assert_eq!(roots(&registry).await, vec![app2.clone()]);
    };

    drive(&mut engine, script).await;
}
