//! Settings-file loading for the scope registry
//!
//! Settings files hold one section per scope, `{scopeName: {key: value}}`,
//! in TOML, JSON or YAML. Applying a document updates existing keys on each
//! scope; declaring a document creates scopes with the section as defaults.

pub mod document;
pub mod error;
pub mod format;

pub use document::{SettingsDocument, load_all};
pub use error::{Error, Result};
pub use format::SettingsFormat;
