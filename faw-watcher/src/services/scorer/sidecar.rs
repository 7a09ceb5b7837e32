//! External scoring process
//!
//! Runs the configured scoring command with the frame path as its single
//! argument and parses a JSON result from stdout:
//!
//! ```json
//! {"face_detected": true, "valence": 0.31, "arousal": -0.12}
//! ```

use super::{AffectScorer, ScoreError};
use crate::models::AffectScore;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Deserialize)]
struct SidecarOutput {
    face_detected: bool,
    #[serde(default)]
    valence: f32,
    #[serde(default)]
    arousal: f32,
}

/// Scorer backed by an external process
pub struct SidecarScorer {
    command: PathBuf,
}

impl SidecarScorer {
    pub fn new(command: PathBuf) -> Self {
        Self { command }
    }
}

#[async_trait]
impl AffectScorer for SidecarScorer {
    async fn score(&self, image: &Path) -> Result<AffectScore, ScoreError> {
        let output = tokio::task::spawn_blocking({
            let command = self.command.clone();
            let image = image.to_path_buf();
            move || Command::new(&command).arg(&image).output()
        })
        .await
        .map_err(|e| {
            ScoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("task join error: {}", e),
            ))
        })?
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ScoreError::ModelFailed(format!(
                "scorer command not found: {}",
                self.command.display()
            )),
            _ => ScoreError::Io(e),
        })?;

        if !output.status.success() {
            return Err(ScoreError::ModelFailed(format!(
                "exit {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let parsed: SidecarOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| ScoreError::ModelFailed(format!("unparseable scorer output: {}", e)))?;

        if !parsed.face_detected {
            return Err(ScoreError::NoFaceDetected);
        }

        Ok(AffectScore {
            valence: parsed.valence,
            arousal: parsed.arousal,
        })
    }
}
