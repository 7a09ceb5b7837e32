//! Shared test doubles and builders for faw-watcher integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use faw_watcher::models::{AffectScore, AuTable};
use faw_watcher::services::csv_sink::CsvSink;
use faw_watcher::services::extraction::{ExtractionError, FeatureExtraction};
use faw_watcher::services::scorer::{AffectScorer, ScoreError};
use faw_watcher::FramePipeline;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Backend double: fixed two-column table, with optional per-filename
/// failures and an "unreachable" mode.
pub struct FakeBackend {
    failing: HashSet<String>,
    unavailable: bool,
}

impl FakeBackend {
    pub fn ok() -> Self {
        Self {
            failing: HashSet::new(),
            unavailable: false,
        }
    }

    pub fn failing_on(names: &[&str]) -> Self {
        Self {
            failing: names.iter().map(|n| n.to_string()).collect(),
            unavailable: false,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            failing: HashSet::new(),
            unavailable: true,
        }
    }
}

#[async_trait]
impl FeatureExtraction for FakeBackend {
    async fn extract(&self, image: &Path) -> Result<AuTable, ExtractionError> {
        if self.unavailable {
            return Err(ExtractionError::BackendUnavailable(
                "fake backend offline".to_string(),
            ));
        }
        if self.failing.contains(&file_name(image)) {
            return Err(ExtractionError::BackendFailed {
                code: Some(1),
                stderr: "scripted failure".to_string(),
            });
        }
        Ok(AuTable {
            columns: vec!["frame".to_string(), "AU01_r".to_string()],
            values: vec!["1".to_string(), "0.52".to_string()],
        })
    }
}

/// Scorer double: constant score, a no-face mode, and per-filename
/// overrides.
pub struct FakeScorer {
    default: Option<AffectScore>,
}

impl FakeScorer {
    pub fn constant(valence: f32, arousal: f32) -> Self {
        Self {
            default: Some(AffectScore { valence, arousal }),
        }
    }

    pub fn no_face() -> Self {
        Self { default: None }
    }
}

#[async_trait]
impl AffectScorer for FakeScorer {
    async fn score(&self, _image: &Path) -> Result<AffectScore, ScoreError> {
        self.default.ok_or(ScoreError::NoFaceDetected)
    }
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub async fn test_pool() -> SqlitePool {
    // One connection: every pooled connection gets its own ":memory:" db.
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    faw_watcher::db::init_tables(&pool).await.unwrap();
    pool
}

pub fn make_pipeline(
    backend: impl FeatureExtraction + 'static,
    scorer: impl AffectScorer + 'static,
    pool: SqlitePool,
    output_root: PathBuf,
) -> Arc<FramePipeline> {
    Arc::new(FramePipeline::new(
        Arc::new(backend),
        Arc::new(scorer),
        pool,
        CsvSink::new(output_root),
        Duration::from_secs(5),
    ))
}

/// Create a session folder with the given frame files under `input_root`.
pub fn seed_session(input_root: &Path, folder_name: &str, frames: &[&str]) -> PathBuf {
    let folder = input_root.join(folder_name);
    std::fs::create_dir_all(&folder).unwrap();
    for frame in frames {
        std::fs::write(folder.join(frame), b"fake image bytes").unwrap();
    }
    folder
}
