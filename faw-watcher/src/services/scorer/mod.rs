//! Affect scoring interface
//!
//! Wraps the opaque pretrained valence/arousal model. Two implementations:
//! an in-process composition over face-detector and model seams
//! ([`FaceModelScorer`]), and an external scoring process
//! ([`sidecar::SidecarScorer`]).
//!
//! All scoring failures are frame-scoped: a frame without a face (or a
//! wedged model) skips the affect columns and the aggregate update, nothing
//! more.

pub mod sidecar;

pub use sidecar::SidecarScorer;

use crate::models::AffectScore;
use async_trait::async_trait;
use image::imageops::FilterType;
use image::RgbImage;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Scoring errors
#[derive(Debug, Error)]
pub enum ScoreError {
    /// No face region found in the frame. An expected outcome, not a bug:
    /// the frame contributes feature columns but no affect.
    #[error("no face detected in frame")]
    NoFaceDetected,

    /// Frame could not be decoded as an image
    #[error("cannot decode frame: {0}")]
    InvalidImage(String),

    /// Model inference (or the scoring process) failed
    #[error("affect model failed: {0}")]
    ModelFailed(String),

    /// I/O error around scoring
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Capability interface over the scoring strategies
#[async_trait]
pub trait AffectScorer: Send + Sync {
    /// Score one frame, yielding its `(valence, arousal)` pair.
    async fn score(&self, image: &Path) -> Result<AffectScore, ScoreError>;
}

/// Axis-aligned face region in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Opaque face-detection collaborator.
///
/// `None` means no face — callers must treat that as a first-class outcome,
/// never index into an assumed detection.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, image: &RgbImage) -> Option<FaceRegion>;
}

/// Opaque pretrained affect model.
///
/// Input is a normalized grayscale square (`size * size` values in `[0, 1]`,
/// row-major). Output range is an external contract pinned by integration
/// testing against a specific model build.
pub trait AffectModel: Send + Sync {
    fn infer(&self, pixels: &[f32], size: u32) -> Result<AffectScore, String>;
}

/// In-process scorer: detect, crop, normalize, infer.
pub struct FaceModelScorer {
    detector: Arc<dyn FaceDetector>,
    model: Arc<dyn AffectModel>,
    /// Side length of the square model input
    input_size: u32,
}

impl FaceModelScorer {
    pub fn new(detector: Arc<dyn FaceDetector>, model: Arc<dyn AffectModel>, input_size: u32) -> Self {
        Self {
            detector,
            model,
            input_size,
        }
    }

    fn score_blocking(
        detector: &dyn FaceDetector,
        model: &dyn AffectModel,
        input_size: u32,
        image_path: &Path,
    ) -> Result<AffectScore, ScoreError> {
        let frame = image::open(image_path)
            .map_err(|e| ScoreError::InvalidImage(e.to_string()))?
            .to_rgb8();

        let region = detector.detect(&frame).ok_or(ScoreError::NoFaceDetected)?;

        // Clamp the region to the frame before cropping.
        let x = region.x.min(frame.width().saturating_sub(1));
        let y = region.y.min(frame.height().saturating_sub(1));
        let width = region.width.max(1).min(frame.width() - x);
        let height = region.height.max(1).min(frame.height() - y);

        let face = image::imageops::crop_imm(&frame, x, y, width, height).to_image();
        let gray = image::imageops::grayscale(&face);
        let resized =
            image::imageops::resize(&gray, input_size, input_size, FilterType::Triangle);

        let pixels: Vec<f32> = resized
            .pixels()
            .map(|p| f32::from(p.0[0]) / 255.0)
            .collect();

        model
            .infer(&pixels, input_size)
            .map_err(ScoreError::ModelFailed)
    }
}

#[async_trait]
impl AffectScorer for FaceModelScorer {
    async fn score(&self, image: &Path) -> Result<AffectScore, ScoreError> {
        let detector = Arc::clone(&self.detector);
        let model = Arc::clone(&self.model);
        let input_size = self.input_size;
        let image = image.to_path_buf();

        tokio::task::spawn_blocking(move || {
            Self::score_blocking(detector.as_ref(), model.as_ref(), input_size, &image)
        })
        .await
        .map_err(|e| {
            ScoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("task join error: {}", e),
            ))
        })?
    }
}
