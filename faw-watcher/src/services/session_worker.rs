//! Per-session worker: poll loop, idle timeout, cleanup
//!
//! One worker owns one session folder for its lifetime. The loop drains
//! image frames through the pipeline, removes each consumed frame, and
//! finalizes the session (remaining files force-removed, folder deleted)
//! once no frame has arrived for the idle timeout.

use crate::models::session::is_image_frame;
use crate::models::{SessionFolder, SessionState};
use crate::services::extraction::ExtractionError;
use crate::services::frame_pipeline::FramePipeline;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Session-fatal worker errors. These terminate one worker; the watcher and
/// all other sessions continue.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Extraction backend unreachable (executable or container missing)
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// A forced removal failed with a non-permission error
    #[error("cannot remove {path}: {source}")]
    Removal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The session folder cannot be listed
    #[error("cannot list session folder {path}: {source}")]
    Listing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One session's lifecycle owner
pub struct SessionWorker {
    session: SessionFolder,
    pipeline: Arc<FramePipeline>,
    poll_interval: Duration,
    idle_timeout: Duration,
    cancel: CancellationToken,
    state: SessionState,
    worker_id: Uuid,
}

impl SessionWorker {
    pub fn new(
        session: SessionFolder,
        pipeline: Arc<FramePipeline>,
        poll_interval: Duration,
        idle_timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session,
            pipeline,
            poll_interval,
            idle_timeout,
            cancel,
            state: SessionState::Active,
            worker_id: Uuid::new_v4(),
        }
    }

    /// Run the poll loop to completion.
    ///
    /// Returns the final state: `Terminated` after a normal idle-timeout
    /// finalization, `Active` when shutdown cancelled the worker mid-session
    /// (frames and folder are left in place for a future run).
    pub async fn run(mut self) -> Result<SessionState, SessionError> {
        info!(
            worker = %self.worker_id,
            session = %self.session.conversation_id,
            group = %self.session.group_id,
            folder = %self.session.path.display(),
            "Session worker started"
        );

        let mut last_frame_time = Instant::now();

        loop {
            if self.cancel.is_cancelled() {
                info!(
                    worker = %self.worker_id,
                    session = %self.session.conversation_id,
                    "Shutdown requested, leaving session in place"
                );
                return Ok(self.state);
            }

            if last_frame_time.elapsed() > self.idle_timeout {
                self.finalize()?;
                return Ok(self.state);
            }

            let frames = self.list_frames()?;
            if frames.is_empty() && !self.session.path.exists() {
                // Folder vanished externally; nothing left to own.
                warn!(
                    worker = %self.worker_id,
                    session = %self.session.conversation_id,
                    "Session folder disappeared, terminating"
                );
                self.state = SessionState::Terminated;
                return Ok(self.state);
            }

            for frame in frames {
                match self.pipeline.process(&self.session, &frame).await {
                    Ok(outcome) => {
                        debug!(
                            worker = %self.worker_id,
                            session = %self.session.conversation_id,
                            frame = %frame.display(),
                            outcome = ?outcome,
                            "Frame consumed"
                        );
                    }
                    Err(e) => {
                        // Session-fatal: backend unreachable. The frame stays
                        // on disk for a future run.
                        return Err(SessionError::Extraction(e));
                    }
                }

                faw_common::fsutil::force_remove_file(&frame).map_err(|source| {
                    SessionError::Removal {
                        path: frame.clone(),
                        source,
                    }
                })?;
                last_frame_time = Instant::now();
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = self.cancel.cancelled() => {}
            }
        }
    }

    /// List image frames currently in the session folder, in directory order.
    fn list_frames(&self) -> Result<Vec<PathBuf>, SessionError> {
        let entries = match std::fs::read_dir(&self.session.path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(SessionError::Listing {
                    path: self.session.path.clone(),
                    source: e,
                })
            }
        };

        let mut frames = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SessionError::Listing {
                path: self.session.path.clone(),
                source: e,
            })?;
            let path = entry.path();
            if path.is_file() && is_image_frame(&path) {
                frames.push(path);
            }
        }
        Ok(frames)
    }

    /// Idle timeout exceeded: force-remove residual files, delete the
    /// folder, transition to Terminated.
    fn finalize(&mut self) -> Result<(), SessionError> {
        self.state = SessionState::Finalizing;
        info!(
            worker = %self.worker_id,
            session = %self.session.conversation_id,
            "Idle timeout exceeded, finalizing session"
        );

        if let Ok(entries) = std::fs::read_dir(&self.session.path) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_file() {
                    faw_common::fsutil::force_remove_file(&path).map_err(|source| {
                        SessionError::Removal {
                            path: path.clone(),
                            source,
                        }
                    })?;
                }
            }
        }

        faw_common::fsutil::force_remove_dir_all(&self.session.path).map_err(|source| {
            SessionError::Removal {
                path: self.session.path.clone(),
                source,
            }
        })?;

        self.state = SessionState::Terminated;
        info!(
            worker = %self.worker_id,
            session = %self.session.conversation_id,
            "Session terminated, folder removed"
        );
        Ok(())
    }
}
