//! Error types for scope-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from scope-core
    #[error(transparent)]
    Core(#[from] scope_core::Error),

    /// Error from scope-settings
    #[error(transparent)]
    Settings(#[from] scope_settings::Error),

    /// Override flags did not parse
    #[error(transparent)]
    Clap(#[from] clap::Error),

    /// JSON serialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}
