use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by chart import, export and file handling.
///
/// Validation problems are not errors; see [`crate::validate`].
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Invalid chart JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to access file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing required field '{field}' in {context}")]
    MissingField { field: &'static str, context: String },

    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: &'static str, message: String },
}

impl ChartError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ChartError::Io {
            path: path.into(),
            source,
        }
    }
}
