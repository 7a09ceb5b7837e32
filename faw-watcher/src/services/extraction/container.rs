//! Containerized extraction backend
//!
//! Runs the extraction tool inside a long-lived container that has the input
//! root volume-mounted. Results are pulled back out with a byte-stream copy
//! keyed by the in-container path, then the in-container temporaries and the
//! consumed image are removed best-effort.

use super::{image_stem, ExtractionError, FeatureExtraction};
use crate::models::AuTable;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Exit codes the container runtime reserves for its own failures
/// (daemon unreachable, container missing, command not runnable).
const RUNTIME_EXIT_CODES: [i32; 3] = [125, 126, 127];

/// Extraction via `docker exec` against a long-lived container
pub struct ContainerBackend {
    /// Container name or id
    container: String,
    /// Extraction executable path inside the container
    executable: String,
    /// Input root on the host (the volume source)
    host_input_root: PathBuf,
    /// Input root as mounted inside the container
    container_input_root: PathBuf,
}

impl ContainerBackend {
    pub fn new(
        container: String,
        executable: String,
        host_input_root: PathBuf,
        container_input_root: PathBuf,
    ) -> Self {
        Self {
            container,
            executable,
            host_input_root,
            container_input_root,
        }
    }

    /// Translate a host-side frame path to its in-container equivalent.
    fn container_path(&self, image: &Path) -> Result<PathBuf, ExtractionError> {
        let relative = image.strip_prefix(&self.host_input_root).map_err(|_| {
            ExtractionError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "frame {} is outside the mounted input root {}",
                    image.display(),
                    self.host_input_root.display()
                ),
            ))
        })?;
        Ok(self.container_input_root.join(relative))
    }

    async fn run_docker(&self, args: Vec<String>) -> Result<Output, ExtractionError> {
        tokio::task::spawn_blocking(move || Command::new("docker").args(&args).output())
            .await
            .map_err(|e| {
                ExtractionError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("task join error: {}", e),
                ))
            })?
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ExtractionError::BackendUnavailable(
                    "docker binary not found in PATH".to_string(),
                ),
                _ => ExtractionError::Io(e),
            })
    }

    /// Best-effort removal of in-container paths; failures are logged only.
    async fn cleanup_container_paths(&self, paths: &[PathBuf]) {
        let mut args = vec![
            "exec".to_string(),
            self.container.clone(),
            "rm".to_string(),
            "-rf".to_string(),
        ];
        args.extend(paths.iter().map(|p| p.to_string_lossy().into_owned()));

        match self.run_docker(args).await {
            Ok(output) if !output.status.success() => {
                tracing::warn!(
                    container = %self.container,
                    stderr = %String::from_utf8_lossy(&output.stderr),
                    "In-container cleanup failed"
                );
            }
            Err(e) => {
                tracing::warn!(container = %self.container, error = %e, "In-container cleanup failed");
            }
            Ok(_) => {}
        }
    }
}

#[async_trait]
impl FeatureExtraction for ContainerBackend {
    async fn extract(&self, image: &Path) -> Result<AuTable, ExtractionError> {
        let stem = image_stem(image)?;
        let inner_image = self.container_path(image)?;
        let inner_out_dir = PathBuf::from(format!("/tmp/faw-extract-{}", uuid::Uuid::new_v4()));
        let inner_result = inner_out_dir.join(format!("{}.csv", stem));

        // Scoped local landing directory for the copied-out result.
        let local_dir = tempfile::TempDir::with_prefix("faw-extract-")?;

        tracing::debug!(
            container = %self.container,
            image = %inner_image.display(),
            out_dir = %inner_out_dir.display(),
            "Running extraction in container"
        );

        let exec = self
            .run_docker(vec![
                "exec".to_string(),
                self.container.clone(),
                self.executable.clone(),
                "-f".to_string(),
                inner_image.to_string_lossy().into_owned(),
                "-out_dir".to_string(),
                inner_out_dir.to_string_lossy().into_owned(),
            ])
            .await?;

        if !exec.status.success() {
            let code = exec.status.code();
            let stderr = String::from_utf8_lossy(&exec.stderr).into_owned();
            self.cleanup_container_paths(&[inner_out_dir]).await;
            if code.map(|c| RUNTIME_EXIT_CODES.contains(&c)).unwrap_or(false) {
                return Err(ExtractionError::BackendUnavailable(format!(
                    "container {} unreachable (exit {:?}): {}",
                    self.container, code, stderr
                )));
            }
            return Err(ExtractionError::BackendFailed { code, stderr });
        }

        // Byte-stream copy of the result, keyed by its in-container path.
        let local_result = local_dir.path().join(format!("{}.csv", stem));
        let cp = self
            .run_docker(vec![
                "cp".to_string(),
                format!("{}:{}", self.container, inner_result.display()),
                local_result.to_string_lossy().into_owned(),
            ])
            .await?;

        if !cp.status.success() {
            self.cleanup_container_paths(&[inner_out_dir]).await;
            return Err(ExtractionError::MissingResult(inner_result));
        }

        let content = tokio::fs::read_to_string(&local_result).await;

        // Consumed image and temporary result are both inside the container's
        // view; remove them best-effort regardless of parse outcome.
        self.cleanup_container_paths(&[inner_out_dir, inner_image])
            .await;

        Ok(AuTable::from_csv(&content?)?)
    }
}
