//! Per-frame processing pipeline
//!
//! Fixed step order per frame: extract → score → CSV append → aggregate
//! update. Per-frame failures degrade gracefully: a failed extraction drops
//! the frame (no row, no aggregate); a failed scoring keeps the feature row
//! but leaves the affect columns empty and skips the aggregate; a store
//! error is caught and logged without touching the CSV output.

use crate::db;
use crate::models::{AffectScore, SessionFolder};
use crate::services::csv_sink::CsvSink;
use crate::services::extraction::{ExtractionError, FeatureExtraction};
use crate::services::scorer::{AffectScorer, ScoreError};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// What became of one consumed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Feature row written, aggregate updated
    Recorded,
    /// Feature row written with empty affect columns, no aggregate update
    RecordedWithoutAffect,
    /// Nothing written
    Dropped,
}

/// Orchestrates one frame through extraction, scoring, output, and the
/// running aggregate.
pub struct FramePipeline {
    backend: Arc<dyn FeatureExtraction>,
    scorer: Arc<dyn AffectScorer>,
    pool: SqlitePool,
    sink: CsvSink,
    extraction_timeout: Duration,
}

impl FramePipeline {
    pub fn new(
        backend: Arc<dyn FeatureExtraction>,
        scorer: Arc<dyn AffectScorer>,
        pool: SqlitePool,
        sink: CsvSink,
        extraction_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            scorer,
            pool,
            sink,
            extraction_timeout,
        }
    }

    /// Process one frame of `session`.
    ///
    /// Returns `Err` only for session-fatal extraction errors (backend
    /// unreachable); every other failure is logged and reflected in the
    /// returned [`FrameOutcome`].
    pub async fn process(
        &self,
        session: &SessionFolder,
        image: &Path,
    ) -> Result<FrameOutcome, ExtractionError> {
        let filename = image
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        // Step 1: extraction. Bounded so a wedged backend can't stall the
        // session forever.
        let extracted =
            match tokio::time::timeout(self.extraction_timeout, self.backend.extract(image)).await
            {
                Err(_) => Err(ExtractionError::TimedOut(self.extraction_timeout)),
                Ok(result) => result,
            };

        let table = match extracted {
            Ok(table) => table,
            Err(e) if e.is_session_fatal() => return Err(e),
            Err(e) => {
                warn!(
                    session = %session.conversation_id,
                    frame = %filename,
                    error = %e,
                    "Extraction failed, frame dropped"
                );
                return Ok(FrameOutcome::Dropped);
            }
        };

        // Step 2: scoring. Failures keep the feature row.
        let score = match self.scorer.score(image).await {
            Ok(score) => Some(score),
            Err(ScoreError::NoFaceDetected) => {
                debug!(
                    session = %session.conversation_id,
                    frame = %filename,
                    "No face detected, affect columns skipped"
                );
                None
            }
            Err(e) => {
                warn!(
                    session = %session.conversation_id,
                    frame = %filename,
                    error = %e,
                    "Scoring failed, affect columns skipped"
                );
                None
            }
        };

        // Step 3: append-only CSV row.
        if let Err(e) = self
            .sink
            .append_row(session, &table, score, &filename, chrono::Utc::now())
        {
            warn!(
                session = %session.conversation_id,
                frame = %filename,
                error = %e,
                "CSV append failed, frame dropped"
            );
            return Ok(FrameOutcome::Dropped);
        }

        // Step 4: running aggregate, only for scored frames. Store failures
        // never propagate; local CSV output is already durable.
        match score {
            Some(AffectScore { valence, arousal }) => {
                if let Err(e) = db::aggregates::update_aggregate(
                    &self.pool,
                    &session.conversation_id,
                    f64::from(valence),
                    f64::from(arousal),
                )
                .await
                {
                    warn!(
                        session = %session.conversation_id,
                        frame = %filename,
                        error = %e,
                        "Aggregate store update failed"
                    );
                }
                Ok(FrameOutcome::Recorded)
            }
            None => Ok(FrameOutcome::RecordedWithoutAffect),
        }
    }
}
