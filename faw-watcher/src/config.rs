//! Daemon configuration
//!
//! Resolution priority: CLI argument → `FAW_*` environment variable → TOML
//! config file → compiled default. The config file path itself resolves via
//! `--config` → `FAW_CONFIG` → `faw-watcher.toml`.

use clap::Parser;
use faw_common::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line interface
#[derive(Debug, Parser)]
#[command(name = "faw-watcher", version, about = "Facial affect session watcher")]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(long, env = "FAW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Parent directory holding session folders
    #[arg(long, env = "FAW_INPUT_ROOT")]
    pub input_root: Option<PathBuf>,

    /// Root directory for per-session output CSVs
    #[arg(long, env = "FAW_OUTPUT_ROOT")]
    pub output_root: Option<PathBuf>,

    /// SQLite database path for running aggregates
    #[arg(long, env = "FAW_DATABASE_PATH")]
    pub database_path: Option<PathBuf>,
}

/// Extraction backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Local extraction executable
    Local,
    /// Long-lived container with the input root volume-mounted
    Container,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Which extraction strategy to run
    #[serde(default = "default_backend_mode")]
    pub mode: BackendMode,
    /// Extraction executable: host path (local) or in-container path
    #[serde(default = "default_backend_executable")]
    pub executable: String,
    /// Container name or id (container mode)
    pub container_name: Option<String>,
    /// Input root as mounted inside the container (container mode)
    pub container_input_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScorerConfig {
    /// External scoring command; receives the frame path as its argument
    pub command: Option<PathBuf>,
}

/// Daemon configuration (TOML shape)
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatcherConfig {
    /// Parent directory holding `{conversationId}_{groupId}` folders
    #[serde(default = "default_input_root")]
    pub input_root: PathBuf,
    /// Root directory for `{groupId}/{conversationId}.csv` output
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    /// SQLite database path for running aggregates
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Seconds without a new frame before a session finalizes
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Poll interval in milliseconds (watcher and workers)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Admission cap on concurrently live sessions
    #[serde(default = "default_max_concurrent_sessions")]
    pub max_concurrent_sessions: usize,
    /// Upper bound on one extraction call
    #[serde(default = "default_extraction_timeout_secs")]
    pub extraction_timeout_secs: u64,
    /// How long shutdown waits for workers before aborting them
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    /// How long a folder stays parked after its worker dies session-fatally
    #[serde(default = "default_failure_backoff_secs")]
    pub failure_backoff_secs: u64,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub scorer: ScorerConfig,
}

fn default_input_root() -> PathBuf {
    PathBuf::from("webcam_frames")
}

fn default_output_root() -> PathBuf {
    PathBuf::from("action_units")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("faw.db")
}

fn default_idle_timeout_secs() -> u64 {
    20
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_concurrent_sessions() -> usize {
    32
}

fn default_extraction_timeout_secs() -> u64 {
    120
}

fn default_shutdown_grace_secs() -> u64 {
    5
}

fn default_failure_backoff_secs() -> u64 {
    30
}

fn default_backend_mode() -> BackendMode {
    BackendMode::Local
}

fn default_backend_executable() -> String {
    "FaceLandmarkImg".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            mode: default_backend_mode(),
            executable: default_backend_executable(),
            container_name: None,
            container_input_root: None,
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            input_root: default_input_root(),
            output_root: default_output_root(),
            database_path: default_database_path(),
            idle_timeout_secs: default_idle_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            max_concurrent_sessions: default_max_concurrent_sessions(),
            extraction_timeout_secs: default_extraction_timeout_secs(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            failure_backoff_secs: default_failure_backoff_secs(),
            backend: BackendConfig::default(),
            scorer: ScorerConfig::default(),
        }
    }
}

impl WatcherConfig {
    /// Load configuration, applying CLI/env overrides on top of the file.
    pub fn load(cli: &Cli) -> Result<Self> {
        let path = faw_common::config::resolve_config_path(
            cli.config.as_deref(),
            "FAW_CONFIG",
            "faw-watcher.toml",
        );
        let mut config: WatcherConfig = faw_common::config::load_toml_config(&path)?;

        if let Some(input_root) = &cli.input_root {
            config.input_root = input_root.clone();
        }
        if let Some(output_root) = &cli.output_root {
            config.output_root = output_root.clone();
        }
        if let Some(database_path) = &cli.database_path {
            config.database_path = database_path.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the daemon cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be positive".into()));
        }
        if self.max_concurrent_sessions == 0 {
            return Err(Error::Config(
                "max_concurrent_sessions must be positive".into(),
            ));
        }
        if self.backend.mode == BackendMode::Container {
            if self.backend.container_name.is_none() {
                return Err(Error::Config(
                    "backend.container_name is required in container mode".into(),
                ));
            }
            if self.backend.container_input_root.is_none() {
                return Err(Error::Config(
                    "backend.container_input_root is required in container mode".into(),
                ));
            }
        }
        if self.scorer.command.is_none() {
            return Err(Error::Config(
                "scorer.command is required (external affect scoring process)".into(),
            ));
        }
        Ok(())
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn failure_backoff(&self) -> Duration {
        Duration::from_secs(self.failure_backoff_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_observed_tunables() {
        let config = WatcherConfig::default();
        assert_eq!(config.idle_timeout_secs, 20);
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.backend.mode, BackendMode::Local);
    }

    #[test]
    fn parses_full_toml() {
        let config: WatcherConfig = toml::from_str(
            r#"
            input_root = "/data/webcam"
            output_root = "/data/au"
            database_path = "/data/faw.db"
            idle_timeout_secs = 50
            poll_interval_ms = 250
            max_concurrent_sessions = 8

            [backend]
            mode = "container"
            executable = "/opt/extractor/FaceLandmarkImg"
            container_name = "faw-extractor"
            container_input_root = "/mnt/webcam"

            [scorer]
            command = "/opt/faw/score_affect"
            "#,
        )
        .unwrap();

        assert_eq!(config.idle_timeout_secs, 50);
        assert_eq!(config.backend.mode, BackendMode::Container);
        assert_eq!(
            config.backend.container_name.as_deref(),
            Some("faw-extractor")
        );
        assert_eq!(
            config.scorer.command.as_deref(),
            Some(std::path::Path::new("/opt/faw/score_affect"))
        );
        config.validate().unwrap();
    }

    #[test]
    fn unrecognized_scorer_keys_are_rejected() {
        // Every accepted key must drive behavior; anything else is an error,
        // not a silently ignored setting.
        let result: std::result::Result<WatcherConfig, _> = toml::from_str(
            r#"
            [scorer]
            command = "/opt/faw/score_affect"
            model_input_size = 64
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn container_mode_requires_container_fields() {
        let config: WatcherConfig = toml::from_str(
            r#"
            [backend]
            mode = "container"

            [scorer]
            command = "/opt/faw/score_affect"
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn scorer_command_is_required() {
        let config = WatcherConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let config = WatcherConfig {
            poll_interval_ms: 0,
            ..WatcherConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
