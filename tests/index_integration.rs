//! Integration tests for the project file index.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;

use fileindex::index::{
    pump_events, FileIndex, IndexPhase, NotifyWatcher, PathClassifier, PatternClassifier,
    ProjectHandle, ReloadController, ReloadMode, StaticProject, WatchEvent,
    WatchSubscription,
};
use fileindex::Config;

struct System {
    index: Arc<FileIndex>,
    controller: ReloadController,
    project: Arc<dyn ProjectHandle>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn build_system(root: &Path, config: &Config) -> System {
    init_tracing();

    let project: Arc<dyn ProjectHandle> = Arc::new(StaticProject::new(root));
    let classifier: Arc<dyn PathClassifier> =
        Arc::new(PatternClassifier::for_project(project.as_ref()).unwrap());
    let (watcher, _events) = NotifyWatcher::new().unwrap();
    let watcher: Arc<dyn WatchSubscription> = Arc::new(watcher);

    let (index, reload_rx) = FileIndex::new(
        Arc::downgrade(&project),
        Arc::clone(&classifier),
        watcher,
        config,
    );
    let controller =
        ReloadController::new(&index, Arc::downgrade(&project), classifier, config, reload_rx);

    System {
        index,
        controller,
        project,
    }
}

/// Build the reference tree: root/{a.c, sub/b.c, .git/ignored.c}.
fn build_reference_tree(root: &Path) {
    let sub = root.join("sub");
    let git = root.join(".git");
    fs::create_dir_all(&sub).unwrap();
    fs::create_dir_all(&git).unwrap();
    fs::write(root.join("a.c"), "int a;").unwrap();
    fs::write(sub.join("b.c"), "int b;").unwrap();
    fs::write(git.join("ignored.c"), "int ignored;").unwrap();
}

/// A full scan of the reference tree yields exactly the unfiltered files and
/// the index maps each directory to its bare names.
#[tokio::test]
async fn test_round_trip_scan_and_merge() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    build_reference_tree(root);

    let system = build_system(root, &Config::default());
    system.controller.reload(ReloadMode::Synchronous);

    assert_eq!(system.index.phase(), IndexPhase::Synchronized);
    assert_eq!(system.index.file_count(), 2);
    assert_eq!(system.index.files_in(root).unwrap(), vec!["a.c"]);
    assert_eq!(system.index.files_in(&root.join("sub")).unwrap(), vec!["b.c"]);
    assert!(system.index.files_in(&root.join(".git")).is_none());
}

/// An added file extends its directory without touching sibling directories.
#[tokio::test]
async fn test_added_event_extends_directory() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    build_reference_tree(root);

    let system = build_system(root, &Config::default());
    system.controller.reload(ReloadMode::Synchronous);

    system.index.on_file_added(&root.join("sub/c.c"));

    assert_eq!(
        system.index.files_in(&root.join("sub")).unwrap(),
        vec!["b.c", "c.c"]
    );
    assert_eq!(system.index.files_in(root).unwrap(), vec!["a.c"]);
}

/// Removing every file in a directory removes the directory entry and its
/// watch subscription.
#[tokio::test]
async fn test_removed_events_drop_empty_directory() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    build_reference_tree(root);

    let system = build_system(root, &Config::default());
    system.controller.reload(ReloadMode::Synchronous);
    system.index.on_file_added(&root.join("sub/c.c"));

    system.index.on_file_removed(&root.join("sub/b.c"));
    system.index.on_file_removed(&root.join("sub/c.c"));

    assert!(system.index.files_in(&root.join("sub")).is_none());
    assert!(!system.index.watched_dirs().contains(&root.join("sub")));
    assert_eq!(system.index.files_in(root).unwrap(), vec!["a.c"]);
}

/// The watched set tracks the tracked-directory set after merges and
/// incremental updates.
#[tokio::test]
async fn test_watch_set_tracks_directory_keys() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    build_reference_tree(root);

    let system = build_system(root, &Config::default());
    system.controller.reload(ReloadMode::Synchronous);

    let mut watched = system.index.watched_dirs();
    watched.sort();
    let mut dirs = system.index.directories();
    dirs.sort();
    assert_eq!(watched, dirs);

    system.index.on_file_removed(&root.join("a.c"));

    let mut watched = system.index.watched_dirs();
    watched.sort();
    let mut dirs = system.index.directories();
    dirs.sort();
    assert_eq!(watched, dirs);
}

/// Dropping the index while an asynchronous scan is in flight must not crash
/// and must stop the controller.
#[tokio::test]
async fn test_index_dropped_with_scan_in_flight() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    build_reference_tree(root);

    let System {
        index,
        controller,
        project,
    } = build_system(root, &Config::default());

    let handle = tokio::spawn(controller.run());

    // Request an asynchronous reload through the index, then tear the index
    // down before the result can land.
    let sub = root.join("sub");
    index.on_file_added(&sub);
    drop(index);

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("controller did not stop after index teardown")
        .unwrap();

    drop(project);
}

/// The controller's run loop applies reload requests sent by the index.
#[tokio::test]
async fn test_run_loop_applies_requested_reload() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    build_reference_tree(root);

    let System {
        index,
        controller,
        project,
    } = build_system(root, &Config::default());
    let handle = tokio::spawn(controller.run());

    // A directory-creation event can only be resolved by a full rescan.
    let late = root.join("late");
    fs::create_dir(&late).unwrap();
    fs::write(late.join("d.c"), "int d;").unwrap();
    index.on_file_added(&late);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while index.files_in(&late).is_none() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "reload never delivered the new directory"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(index.files_in(&late).unwrap(), vec!["d.c"]);

    drop(index);
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();

    drop(project);
}

/// Events flowing through the dispatcher reach the index in arrival order.
#[tokio::test]
async fn test_event_pump_applies_events_in_order() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    build_reference_tree(root);

    let system = build_system(root, &Config::default());
    system.controller.reload(ReloadMode::Synchronous);

    let (tx, rx) = mpsc::unbounded_channel();
    let pump = tokio::spawn(pump_events(Arc::downgrade(&system.index), rx));

    tx.send(WatchEvent::Added(root.join("sub/c.c"))).unwrap();
    tx.send(WatchEvent::Removed(root.join("sub/b.c"))).unwrap();
    drop(tx);

    // The pump drains every queued event before it observes the closed
    // channel, so joining it is a deterministic barrier.
    tokio::time::timeout(Duration::from_secs(5), pump)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        system.index.files_in(&root.join("sub")).unwrap(),
        vec!["c.c"]
    );
}

/// Containment is a root-prefix check, including symlinked spellings.
#[tokio::test]
async fn test_containment_checks() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().canonicalize().unwrap();
    let project_dir = root.join("project");
    fs::create_dir(&project_dir).unwrap();
    fs::write(project_dir.join("a.c"), "int a;").unwrap();

    let system = build_system(&project_dir, &Config::default());

    assert!(system.index.contains(&project_dir.join("a.c")));
    assert!(system.index.contains(&project_dir.join("not-indexed.c")));
    assert!(!system.index.contains(Path::new("/outside/other.c")));

    #[cfg(unix)]
    {
        let link = root.join("link");
        std::os::unix::fs::symlink(&project_dir, &link).unwrap();
        assert!(system.index.contains(&link.join("a.c")));
    }

    drop(system.project);
    assert!(!system.index.contains(&project_dir.join("a.c")));
}

/// Exclude filters flow from configuration through the project handle into
/// the classifier and keep matching files out of the index.
#[tokio::test]
async fn test_project_exclude_filters() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    fs::write(root.join("main.c"), "int main;").unwrap();
    fs::write(root.join("main.o"), "").unwrap();

    let config = Config {
        exclude_patterns: vec!["*.o".to_string()],
        ..Default::default()
    };
    let project: Arc<dyn ProjectHandle> = Arc::new(StaticProject::with_excludes(
        root,
        config.exclude_patterns.clone(),
    ));
    let classifier: Arc<dyn PathClassifier> =
        Arc::new(PatternClassifier::for_project(project.as_ref()).unwrap());
    let (watcher, _events) = NotifyWatcher::new().unwrap();

    let (index, reload_rx) = FileIndex::new(
        Arc::downgrade(&project),
        Arc::clone(&classifier),
        Arc::new(watcher),
        &config,
    );
    let controller =
        ReloadController::new(&index, Arc::downgrade(&project), classifier, &config, reload_rx);

    controller.reload(ReloadMode::Synchronous);

    assert_eq!(index.files_in(root).unwrap(), vec!["main.c"]);
}

/// A stop marker freezes a subtree out of the scan without failing it.
#[tokio::test]
async fn test_stop_marker_prunes_subtree() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    let vendored = root.join("vendored");
    fs::create_dir(&vendored).unwrap();
    fs::write(vendored.join(".fileindex-ignore"), "").unwrap();
    fs::write(vendored.join("dep.c"), "int dep;").unwrap();
    fs::write(root.join("a.c"), "int a;").unwrap();

    let system = build_system(root, &Config::default());
    system.controller.reload(ReloadMode::Synchronous);

    assert_eq!(system.index.file_count(), 1);
    assert!(system.index.files_in(&vendored).is_none());
}
