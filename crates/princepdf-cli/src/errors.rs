//! Error types for the CLI runtime.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use princepdf::{JobError, PoolError};
use princepdf_config::ConfigError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("failed to read '{}': {source}", .path.display())]
    ReadInput {
        path: PathBuf,
        source: Arc<io::Error>,
    },
    #[error("failed to parse job '{}': {source}", .path.display())]
    ParseJob {
        path: PathBuf,
        source: Arc<serde_json::Error>,
    },
    #[error("file '{}' has no usable file name", .path.display())]
    UnnamedFile { path: PathBuf },
    #[error("the job has no input; pass --job or --src")]
    MissingInput,
    #[error("failed to start engine pool: {0}")]
    Pool(#[from] PoolError),
    #[error("rendering failed: {0}")]
    Render(#[from] JobError),
    #[error("failed to write '{}': {source}", .path.display())]
    WriteOutput {
        path: PathBuf,
        source: Arc<io::Error>,
    },
}

impl CliError {
    pub(crate) fn read_input(path: &std::path::Path, source: io::Error) -> Self {
        Self::ReadInput {
            path: path.to_path_buf(),
            source: Arc::new(source),
        }
    }
}
