//! Error types for scope-settings

use std::path::PathBuf;

/// Result type for scope-settings operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or applying settings files
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} settings from {origin}: {message}")]
    Parse {
        origin: String,
        format: String,
        message: String,
    },

    #[error("Unsupported settings format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Cannot apply settings section [{scope}]: {source}")]
    Section {
        scope: String,
        #[source]
        source: scope_core::Error,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn section(scope: impl Into<String>, source: scope_core::Error) -> Self {
        Self::Section {
            scope: scope.into(),
            source,
        }
    }
}
