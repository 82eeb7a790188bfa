//! Error types for the attribute registry

use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostics::Diagnostics;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Registry errors
///
/// Semantic problems in the registry never surface one at a time: they are
/// collected into [`Diagnostics`] and returned together as
/// [`RegistryError::Invalid`]. Only I/O and plumbing failures abort a run
/// on the spot.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Registry is invalid: {} error(s), {} warning(s)", .0.error_count(), .0.warning_count())]
    Invalid(Diagnostics),

    #[error("Drift detected in {count} artifact(s)")]
    Drift { count: usize },

    #[error("Unknown target language: {0}")]
    UnknownTarget(String),

    #[error("Invalid version: {0}")]
    InvalidVersion(#[from] semver::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl RegistryError {
    /// Wrap an I/O error with the path that caused it
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Collected diagnostics, if this is a validation failure
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            Self::Invalid(diagnostics) => Some(diagnostics),
            _ => None,
        }
    }
}
