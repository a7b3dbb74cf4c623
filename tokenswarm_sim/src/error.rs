//! Error types for the simulation harness.

use thiserror::Error;
use tokenswarm_core::SwarmError;

/// Errors that can occur while preparing or exporting a run.
#[derive(Debug, Error)]
pub enum SimError {
    /// Core configuration rejected (e.g. unknown classifier kind)
    #[error(transparent)]
    Config(#[from] SwarmError),

    /// Reading an artifact or writing an export failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Artifact or export (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Artifact parsed but its contents are unusable
    #[error("Malformed classifier artifact: {0}")]
    MalformedArtifact(String),
}

impl SimError {
    /// Creates a malformed-artifact error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedArtifact(msg.into())
    }
}
