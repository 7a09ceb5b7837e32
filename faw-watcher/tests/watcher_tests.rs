//! SessionDirectoryWatcher tests: dedup, admission cap, end-to-end drain,
//! and the process-fatal input-root condition.

mod helpers;

use async_trait::async_trait;
use faw_watcher::models::AuTable;
use faw_watcher::services::extraction::{ExtractionError, FeatureExtraction};
use faw_watcher::services::watcher::WatcherOptions;
use faw_watcher::SessionDirectoryWatcher;
use helpers::{make_pipeline, seed_session, test_pool, FakeBackend, FakeScorer};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn options(input_root: &Path) -> WatcherOptions {
    WatcherOptions {
        input_root: input_root.to_path_buf(),
        poll_interval: Duration::from_millis(25),
        idle_timeout: Duration::from_millis(200),
        max_concurrent_sessions: 32,
        shutdown_grace: Duration::from_secs(2),
        failure_backoff: Duration::from_secs(10),
    }
}

fn watcher(
    opts: WatcherOptions,
    pool: SqlitePool,
    output_root: &Path,
    cancel: CancellationToken,
) -> SessionDirectoryWatcher {
    let pipeline = make_pipeline(
        FakeBackend::ok(),
        FakeScorer::constant(0.2, 0.4),
        pool,
        output_root.to_path_buf(),
    );
    SessionDirectoryWatcher::new(opts, pipeline, cancel)
}

#[tokio::test]
async fn duplicate_creation_observations_yield_one_worker() {
    let dir = tempfile::tempdir().unwrap();
    let folder = seed_session(dir.path(), "abc123_group7", &[]);
    let pool = test_pool().await;
    let mut watcher = watcher(
        options(dir.path()),
        pool,
        &dir.path().join("out"),
        CancellationToken::new(),
    );

    assert!(watcher.on_folder_created(&folder));
    assert!(!watcher.on_folder_created(&folder));
    assert_eq!(watcher.active_sessions(), 1);
}

#[tokio::test]
async fn non_session_folder_names_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("no-underscore");
    std::fs::create_dir(&folder).unwrap();
    let pool = test_pool().await;
    let mut watcher = watcher(
        options(dir.path()),
        pool,
        &dir.path().join("out"),
        CancellationToken::new(),
    );

    assert!(!watcher.on_folder_created(&folder));
    assert_eq!(watcher.active_sessions(), 0);
}

#[tokio::test]
async fn admission_is_bounded_by_the_session_cap() {
    let dir = tempfile::tempdir().unwrap();
    let first = seed_session(dir.path(), "abc123_group7", &[]);
    let second = seed_session(dir.path(), "def456_group7", &[]);
    let pool = test_pool().await;

    let mut opts = options(dir.path());
    opts.max_concurrent_sessions = 1;
    let mut watcher = watcher(
        opts,
        pool,
        &dir.path().join("out"),
        CancellationToken::new(),
    );

    assert!(watcher.on_folder_created(&first));
    assert!(!watcher.on_folder_created(&second));
    assert_eq!(watcher.active_sessions(), 1);
}

#[tokio::test]
async fn watcher_drains_a_session_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let input_root = dir.path().join("webcam");
    std::fs::create_dir(&input_root).unwrap();
    let folder = seed_session(&input_root, "abc123_group7", &["f1.jpg"]);
    let pool = test_pool().await;
    let cancel = CancellationToken::new();

    let watcher = watcher(
        options(&input_root),
        pool.clone(),
        &dir.path().join("out"),
        cancel.clone(),
    );
    let handle = tokio::spawn(watcher.run());

    // One frame, then silence past the idle timeout: the session terminates
    // and its folder disappears.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while folder.exists() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert!(!folder.exists(), "session folder should have been removed");

    let csv = std::fs::read_to_string(dir.path().join("out/group7/abc123.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("f1.jpg"));

    let aggregate = faw_watcher::db::aggregates::load_aggregate(&pool, "abc123")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(aggregate.count, 1);

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn disappearing_input_root_is_process_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let input_root = dir.path().join("webcam");
    std::fs::create_dir(&input_root).unwrap();
    let pool = test_pool().await;

    let watcher = watcher(
        options(&input_root),
        pool,
        &dir.path().join("out"),
        CancellationToken::new(),
    );
    let handle = tokio::spawn(watcher.run());

    tokio::time::sleep(Duration::from_millis(60)).await;
    std::fs::remove_dir_all(&input_root).unwrap();

    let result = handle.await.unwrap();
    assert!(result.is_err());
}

/// Always-offline backend that counts extraction attempts.
struct OfflineBackend {
    attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl FeatureExtraction for OfflineBackend {
    async fn extract(&self, _image: &Path) -> Result<AuTable, ExtractionError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(ExtractionError::BackendUnavailable(
            "backend offline".to_string(),
        ))
    }
}

#[tokio::test]
async fn failed_session_is_parked_instead_of_respawned_every_poll() {
    let dir = tempfile::tempdir().unwrap();
    let input_root = dir.path().join("webcam");
    std::fs::create_dir(&input_root).unwrap();
    let folder = seed_session(&input_root, "abc123_group7", &["f1.jpg"]);
    let pool = test_pool().await;
    let cancel = CancellationToken::new();

    let attempts = Arc::new(AtomicUsize::new(0));
    let pipeline = make_pipeline(
        OfflineBackend {
            attempts: Arc::clone(&attempts),
        },
        FakeScorer::constant(0.2, 0.4),
        pool,
        dir.path().join("out"),
    );
    let watcher = SessionDirectoryWatcher::new(options(&input_root), pipeline, cancel.clone());
    let handle = tokio::spawn(watcher.run());

    // Many poll intervals pass; the folder must not be re-admitted while
    // its backoff is pending.
    tokio::time::sleep(Duration::from_millis(500)).await;
    cancel.cancel();
    handle.await.unwrap().unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert!(folder.join("f1.jpg").exists(), "failed frame must stay on disk");
}

#[tokio::test]
async fn terminated_session_id_can_return_as_a_new_session() {
    let dir = tempfile::tempdir().unwrap();
    let input_root = dir.path().join("webcam");
    std::fs::create_dir(&input_root).unwrap();
    let pool = test_pool().await;
    let cancel = CancellationToken::new();

    let watcher = watcher(
        options(&input_root),
        pool.clone(),
        &dir.path().join("out"),
        cancel.clone(),
    );
    let handle = tokio::spawn(watcher.run());

    let folder = seed_session(&input_root, "abc123_group7", &["f1.jpg"]);
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while folder.exists() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert!(!folder.exists());

    // Same identifier reappears; the aggregate keeps accumulating.
    let reborn = seed_session(&input_root, "abc123_group7", &["f2.jpg"]);
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while reborn.exists() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert!(!reborn.exists());

    let aggregate = faw_watcher::db::aggregates::load_aggregate(&pool, "abc123")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(aggregate.count, 2);

    cancel.cancel();
    handle.await.unwrap().unwrap();
}
