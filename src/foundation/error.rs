use std::path::PathBuf;

/// Convenience result type used across the recorder.
pub type ReplayResult<T> = Result<T, ReplayError>;

/// Top-level error taxonomy for recoverable recorder failures.
///
/// Caller bugs (duplicate instance creation, deletion notices for unknown nodes) are not part of
/// this taxonomy; they panic at the call site.
#[derive(thiserror::Error, Debug)]
pub enum ReplayError {
    /// Invalid user-provided data (scripts, configuration, payloads).
    #[error("validation error: {0}")]
    Validation(String),

    /// Scene host rejected an operation (unknown or destroyed node).
    #[error("scene error: {0}")]
    Scene(String),

    /// Errors when serializing or deserializing documents.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Failure while writing a document to its destination.
    #[error("io error at '{}': {source}", .path.display())]
    Io {
        /// Destination that could not be written.
        path: PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReplayError {
    /// Build a [`ReplayError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ReplayError::Scene`] value.
    pub fn scene(msg: impl Into<String>) -> Self {
        Self::Scene(msg.into())
    }

    /// Build a [`ReplayError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Build a [`ReplayError::Io`] value for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for ReplayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
