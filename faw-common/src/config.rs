//! Configuration file resolution and loading
//!
//! Config file path resolution follows a fixed priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Compiled default file name in the working directory

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Resolve the configuration file path.
///
/// `cli_arg` wins over the environment variable named by `env_var`, which
/// wins over `default_name` relative to the working directory.
pub fn resolve_config_path(
    cli_arg: Option<&Path>,
    env_var: &str,
    default_name: &str,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    PathBuf::from(default_name)
}

/// Load a TOML configuration file into `T`.
///
/// A missing file yields `T::default()` (zero-config startup); a present but
/// malformed file is a configuration error.
pub fn load_toml_config<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}
