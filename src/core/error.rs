use std::path::PathBuf;
use thiserror::Error;

use crate::core::archive::ExtractError;
use crate::core::downloader::FetchError;
use crate::core::options::PatchError;
use crate::core::paths::EnvironmentError;

/// Central error type for the installer backend.
/// Component errors convert into it at the pipeline boundary.
#[derive(Debug, Error)]
pub enum InstallerError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Environment ─────────────────────────────────────
    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    // ── Network ─────────────────────────────────────────
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    // ── Archive ─────────────────────────────────────────
    #[error(transparent)]
    Extract(#[from] ExtractError),

    // ── Options ─────────────────────────────────────────
    #[error(transparent)]
    Patch(#[from] PatchError),

    // ── Configuration ───────────────────────────────────
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Runtime ─────────────────────────────────────────
    #[error("Background task failed: {0}")]
    Task(String),
}

/// Convenience alias used throughout the crate.
pub type InstallerResult<T> = Result<T, InstallerError>;

impl InstallerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        InstallerError::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the run stopped because the caller asked it to.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, InstallerError::Fetch(FetchError::Cancelled))
    }
}

impl From<tokio::task::JoinError> for InstallerError {
    fn from(source: tokio::task::JoinError) -> Self {
        InstallerError::Task(source.to_string())
    }
}
