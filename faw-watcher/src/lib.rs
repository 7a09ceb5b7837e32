//! faw-watcher library interface
//!
//! Exposes the session lifecycle manager and per-frame processing pipeline
//! for integration testing and embedding.

pub mod config;
pub mod db;
pub mod models;
pub mod services;

pub use config::WatcherConfig;
pub use models::{AffectAggregate, AffectScore, AuTable, SessionFolder, SessionState};
pub use services::extraction::{ExtractionError, FeatureExtraction};
pub use services::frame_pipeline::{FrameOutcome, FramePipeline};
pub use services::scorer::{AffectScorer, ScoreError};
pub use services::session_worker::{SessionError, SessionWorker};
pub use services::watcher::SessionDirectoryWatcher;
