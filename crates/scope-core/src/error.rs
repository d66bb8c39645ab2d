//! Error types for scope-core

/// Result type for scope-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while creating scopes or reading their values
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A scope name is empty or not dot-segmented
    #[error("Invalid scope name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// A key is not a single name segment
    #[error("Invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// A key is missing from the whole ancestor chain, or from the
    /// node itself when updating
    #[error("Key not found in scope {scope}: {key}")]
    KeyNotFound { scope: String, key: String },

    /// Raw input could not be coerced to the declared kind
    #[error("Cannot convert {raw:?} to {expected}")]
    TypeMismatch { expected: String, raw: String },

    /// Template interpolation nested too deeply
    #[error("Template recursion limit of {limit} exceeded")]
    RecursionLimit { limit: usize },

    /// A template could not be parsed or a format spec is malformed
    #[error("Invalid template {template:?}: {message}")]
    InvalidTemplate { template: String, message: String },

    /// A path template was used in a direction its mode forbids
    #[error("Path {key} in scope {scope} is {mode}, cannot be used for {requested}")]
    AccessMode {
        scope: String,
        key: String,
        mode: String,
        requested: String,
    },
}

impl Error {
    pub(crate) fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn key_not_found(scope: impl Into<String>, key: impl Into<String>) -> Self {
        Self::KeyNotFound {
            scope: scope.into(),
            key: key.into(),
        }
    }

    pub(crate) fn type_mismatch(expected: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            raw: raw.into(),
        }
    }

    pub(crate) fn invalid_template(template: &str, message: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            template: template.to_string(),
            message: message.into(),
        }
    }

    /// True when this is a missing-key error
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, Error::KeyNotFound { .. })
    }
}
