use std::path::{Path, PathBuf};

use thiserror::Error;

/// Convenient alias for results produced inside the feature library.
pub type Result<T> = std::result::Result<T, FeatureError>;

/// Reasons a single measurement can fail. Never crosses the engine boundary:
/// every variant collapses to an absent value there.
#[derive(Debug, Clone, Error)]
pub enum FeatureError {
    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("segment contains too few samples")]
    EmptySegment,

    #[error("measurement undefined: {0}")]
    Undefined(&'static str),
}

impl FeatureError {
    pub fn decode(path: &Path, reason: impl std::fmt::Display) -> Self {
        FeatureError::Decode {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Decode failures depend on the filesystem and are worth retrying later;
    /// everything else is a deterministic property of the audio.
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, FeatureError::Decode { .. })
    }
}
