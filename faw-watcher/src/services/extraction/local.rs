//! Local-process extraction backend
//!
//! Invokes the extraction executable synchronously with the image path and a
//! per-frame temporary output directory, then reads the produced
//! `<imageStem>.csv` from that directory.

use super::{image_stem, ExtractionError, FeatureExtraction};
use crate::models::AuTable;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Extraction via a local executable:
/// `<executable> -f <imagePath> -out_dir <tempDir>`
pub struct LocalProcessBackend {
    executable: PathBuf,
}

impl LocalProcessBackend {
    pub fn new(executable: PathBuf) -> Self {
        Self { executable }
    }
}

#[async_trait]
impl FeatureExtraction for LocalProcessBackend {
    async fn extract(&self, image: &Path) -> Result<AuTable, ExtractionError> {
        let stem = image_stem(image)?;

        // Scoped per-frame output directory; removed on every exit path
        // when this binding drops.
        let out_dir = tempfile::TempDir::with_prefix("faw-extract-")?;

        tracing::debug!(
            image = %image.display(),
            out_dir = %out_dir.path().display(),
            "Running extraction executable"
        );

        let output = tokio::task::spawn_blocking({
            let executable = self.executable.clone();
            let image = image.to_path_buf();
            let out_dir = out_dir.path().to_path_buf();

            move || {
                Command::new(&executable)
                    .arg("-f")
                    .arg(&image)
                    .arg("-out_dir")
                    .arg(&out_dir)
                    .output()
            }
        })
        .await
        .map_err(|e| {
            ExtractionError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("task join error: {}", e),
            ))
        })?
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ExtractionError::BackendUnavailable(format!(
                "extraction executable not found: {}",
                self.executable.display()
            )),
            _ => ExtractionError::Io(e),
        })?;

        if !output.status.success() {
            return Err(ExtractionError::BackendFailed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let result_file = out_dir.path().join(format!("{}.csv", stem));
        let content = match tokio::fs::read_to_string(&result_file).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ExtractionError::MissingResult(result_file));
            }
            Err(e) => return Err(ExtractionError::Io(e)),
        };

        Ok(AuTable::from_csv(&content)?)
    }
}
