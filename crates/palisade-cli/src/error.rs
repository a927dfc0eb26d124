//! CLI error types

use palisade_controls::ControlError;
use thiserror::Error;

/// Fatal CLI errors. Per-profile parse and resolution failures are
/// reported and tolerated; only shared-infrastructure problems (control
/// store, build environment, output I/O) end up here.
#[derive(Debug, Error)]
pub enum CliError {
    /// Build environment error
    #[error("build environment: {0}")]
    Environment(String),

    /// Control store failed to load
    #[error(transparent)]
    Controls(#[from] ControlError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
