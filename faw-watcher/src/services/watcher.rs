//! Session directory watcher
//!
//! Polls the input root (non-recursive) for new session folders and owns
//! the folder→worker registry. All spawn decisions run serially inside this
//! dispatcher, so the check-and-insert on the registry is atomic and two
//! near-simultaneous observations of the same folder yield exactly one
//! worker. Registry entries are removed when their worker exits, letting a
//! reused session identifier start a fresh worker.

use crate::models::{SessionFolder, SessionState};
use crate::services::frame_pipeline::FramePipeline;
use crate::services::session_worker::{SessionError, SessionWorker};
use faw_common::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Watcher tunables
#[derive(Debug, Clone)]
pub struct WatcherOptions {
    /// Parent directory holding session folders
    pub input_root: PathBuf,
    /// Watcher and worker poll interval
    pub poll_interval: Duration,
    /// Session idle timeout
    pub idle_timeout: Duration,
    /// Admission cap on live workers
    pub max_concurrent_sessions: usize,
    /// How long shutdown waits for workers to finish their iteration
    pub shutdown_grace: Duration,
    /// How long a folder stays parked after a session-fatal worker exit
    pub failure_backoff: Duration,
}

/// Discovers session folders and supervises their workers.
pub struct SessionDirectoryWatcher {
    options: WatcherOptions,
    pipeline: Arc<FramePipeline>,
    cancel: CancellationToken,
    /// Folder path → live worker. Mutated only by this dispatcher.
    active: HashMap<PathBuf, SessionFolder>,
    /// Folders whose worker died session-fatally, with the earliest instant
    /// they may be re-admitted. Keeps a down backend from being re-spawned
    /// against every poll.
    parked: HashMap<PathBuf, tokio::time::Instant>,
    workers: JoinSet<(PathBuf, std::result::Result<SessionState, SessionError>)>,
}

impl SessionDirectoryWatcher {
    pub fn new(
        options: WatcherOptions,
        pipeline: Arc<FramePipeline>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            options,
            pipeline,
            cancel,
            active: HashMap::new(),
            parked: HashMap::new(),
            workers: JoinSet::new(),
        }
    }

    /// Number of live session workers.
    pub fn active_sessions(&self) -> usize {
        self.active.len()
    }

    /// Run until cancelled or until the input root becomes unreadable (the
    /// one process-fatal condition).
    pub async fn run(mut self) -> Result<()> {
        info!(
            input_root = %self.options.input_root.display(),
            poll_interval_ms = self.options.poll_interval.as_millis() as u64,
            idle_timeout_s = self.options.idle_timeout.as_secs(),
            max_sessions = self.options.max_concurrent_sessions,
            "Session directory watcher started"
        );

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            self.reap_finished();

            if let Err(e) = self.poll_input_root() {
                error!(
                    input_root = %self.options.input_root.display(),
                    error = %e,
                    "Input root unreadable, shutting down"
                );
                self.cancel.cancel();
                self.drain_workers().await;
                return Err(e);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.options.poll_interval) => {}
                _ = self.cancel.cancelled() => {}
            }
        }

        info!("Watcher cancelled, waiting for session workers");
        self.drain_workers().await;
        Ok(())
    }

    /// One non-recursive scan of the input root.
    fn poll_input_root(&mut self) -> Result<()> {
        let entries = std::fs::read_dir(&self.options.input_root).map_err(|e| {
            Error::NotFound(format!(
                "input root {}: {}",
                self.options.input_root.display(),
                e
            ))
        })?;

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                self.on_folder_created(&path);
            }
        }
        Ok(())
    }

    /// Idempotent creation handler: atomic check-and-insert, then spawn.
    ///
    /// Returns true when a new worker was admitted. A folder observed while
    /// the admission cap is reached is skipped and retried on a later poll.
    pub fn on_folder_created(&mut self, path: &Path) -> bool {
        if self.active.contains_key(path) {
            return false;
        }

        if let Some(&retry_at) = self.parked.get(path) {
            if tokio::time::Instant::now() < retry_at {
                return false;
            }
            self.parked.remove(path);
        }

        let Some(session) = SessionFolder::parse(path) else {
            debug!(folder = %path.display(), "Ignoring non-session folder");
            return false;
        };

        if self.active.len() >= self.options.max_concurrent_sessions {
            debug!(
                folder = %path.display(),
                cap = self.options.max_concurrent_sessions,
                "Session cap reached, deferring admission"
            );
            return false;
        }

        // Insert before spawning; the registry entry is what dedups.
        self.active.insert(path.to_path_buf(), session.clone());

        let worker = SessionWorker::new(
            session,
            Arc::clone(&self.pipeline),
            self.options.poll_interval,
            self.options.idle_timeout,
            self.cancel.child_token(),
        );
        let key = path.to_path_buf();
        self.workers.spawn(async move { (key, worker.run().await) });
        true
    }

    /// Unregister workers that have exited, logging their outcome.
    fn reap_finished(&mut self) {
        while let Some(joined) = self.workers.try_join_next() {
            match joined {
                Ok((path, result)) => {
                    self.active.remove(&path);
                    match result {
                        Ok(state) => {
                            debug!(folder = %path.display(), state = %state, "Worker exited");
                        }
                        Err(e) => {
                            warn!(
                                folder = %path.display(),
                                error = %e,
                                backoff_s = self.options.failure_backoff.as_secs(),
                                "Worker failed, parking folder"
                            );
                            self.parked.insert(
                                path,
                                tokio::time::Instant::now() + self.options.failure_backoff,
                            );
                        }
                    }
                }
                Err(join_error) => {
                    // A panicked task yields no registry key. Once no workers
                    // remain the registry is known-empty and can be reset.
                    warn!(error = %join_error, "Worker task panicked");
                    if self.workers.is_empty() {
                        self.active.clear();
                    }
                }
            }
        }
    }

    /// Wait up to the grace period for workers, then abort stragglers.
    async fn drain_workers(&mut self) {
        let deadline = tokio::time::Instant::now() + self.options.shutdown_grace;
        loop {
            let timeout = tokio::time::timeout_at(deadline, self.workers.join_next());
            match timeout.await {
                Ok(Some(Ok((path, result)))) => {
                    self.active.remove(&path);
                    match result {
                        Ok(state) => {
                            debug!(folder = %path.display(), state = %state, "Worker finished")
                        }
                        Err(e) => warn!(folder = %path.display(), error = %e, "Worker failed"),
                    }
                }
                Ok(Some(Err(join_error))) => {
                    warn!(error = %join_error, "Worker task panicked during shutdown");
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        remaining = self.workers.len(),
                        "Shutdown grace period expired, aborting remaining workers"
                    );
                    self.workers.abort_all();
                    while self.workers.join_next().await.is_some() {}
                    break;
                }
            }
        }
        self.active.clear();
        info!("All session workers stopped");
    }
}
