//! Error types for the TokenSwarm core.

use thiserror::Error;

/// Errors raised while configuring a run.
///
/// Everything that happens once ticks start is total: movement clamps,
/// inactive agents no-op, consensus always returns a set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SwarmError {
    /// Classifier kind selector did not name a supported variant
    #[error("Unsupported classifier kind: {0}")]
    UnsupportedClassifierKind(String),
}

impl SwarmError {
    /// Creates an unsupported-kind error.
    pub fn unsupported_kind(kind: impl Into<String>) -> Self {
        Self::UnsupportedClassifierKind(kind.into())
    }
}
