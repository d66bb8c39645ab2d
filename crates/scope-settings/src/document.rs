//! Settings documents
//!
//! A document maps scope names to key/value sections:
//!
//! ```toml
//! [model]
//! draws = 100
//!
//! [model.cod]
//! acause = "cvd"
//! ```
//!
//! Nested tables name child scopes, so `[model.cod]` above is the section for
//! scope `model.cod`. Top-level scalars belong to the root scope.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use scope_core::{ROOT_NAME, Registry, Scalar, validate_key};
use serde::Deserialize;

use crate::format::SettingsFormat;
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Entry {
    Scalar(Scalar),
    Table(BTreeMap<String, Entry>),
}

/// Parsed `{scopeName: {key: value}}` settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsDocument {
    sections: BTreeMap<String, BTreeMap<String, Scalar>>,
}

impl SettingsDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document from text in the given format.
    pub fn parse(content: &str, format: SettingsFormat) -> Result<Self> {
        Self::parse_from(content, format, "<string>")
    }

    /// Read and parse a settings file, picking the format from its extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = SettingsFormat::from_path(path)?;
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        tracing::debug!(?path, %format, "Loading settings file");
        Self::parse_from(&content, format, &path.display().to_string())
    }

    fn parse_from(content: &str, format: SettingsFormat, origin: &str) -> Result<Self> {
        let tree: Option<BTreeMap<String, Entry>> = format.deserialize(content, origin)?;
        let mut document = Self::new();
        for (name, entry) in tree.unwrap_or_default() {
            match entry {
                Entry::Scalar(value) => document.insert_checked(ROOT_NAME, name, value)?,
                Entry::Table(table) => document.flatten(name, table)?,
            }
        }
        Ok(document)
    }

    fn flatten(&mut self, scope: String, table: BTreeMap<String, Entry>) -> Result<()> {
        self.sections.entry(scope.clone()).or_default();
        for (key, entry) in table {
            match entry {
                Entry::Scalar(value) => self.insert_checked(&scope, key, value)?,
                Entry::Table(child) => self.flatten(format!("{scope}.{key}"), child)?,
            }
        }
        Ok(())
    }

    fn insert_checked(&mut self, scope: &str, key: String, value: Scalar) -> Result<()> {
        validate_key(&key).map_err(|e| Error::section(scope, e))?;
        self.insert(scope, key, value);
        Ok(())
    }

    /// Set `key` in the section for `scope`, replacing an earlier value.
    pub fn insert(&mut self, scope: &str, key: impl Into<String>, value: impl Into<Scalar>) {
        self.sections
            .entry(scope.to_string())
            .or_default()
            .insert(key.into(), value.into());
    }

    pub fn section(&self, scope: &str) -> Option<&BTreeMap<String, Scalar>> {
        self.sections.get(scope)
    }

    /// Sections ordered by scope name.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, Scalar>)> {
        self.sections.iter().map(|(scope, keys)| (scope.as_str(), keys))
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Update existing keys on each section's scope.
    ///
    /// Scopes are created if needed, but every key must already be defined
    /// locally on its scope. The first failing section stops the load.
    pub fn apply(&self, registry: &Registry) -> Result<()> {
        for (scope, keys) in &self.sections {
            if keys.is_empty() {
                tracing::warn!(scope = %scope, "Skipping empty settings section");
                continue;
            }
            let node = registry
                .get_or_create(scope)
                .map_err(|e| Error::section(scope, e))?;
            node.update(keys.iter().map(|(k, v)| (k, v.clone())))
                .map_err(|e| Error::section(scope, e))?;
        }
        Ok(())
    }

    /// Create each section's scope with the section as its defaults.
    ///
    /// Kinds are inferred from the scalars. Scopes that already hold keys keep
    /// them.
    pub fn declare(&self, registry: &Registry) -> Result<()> {
        for (scope, keys) in &self.sections {
            registry
                .get_or_create_with(scope, keys.clone())
                .map_err(|e| Error::section(scope, e))?;
        }
        Ok(())
    }
}

/// Apply settings files first to last.
pub fn load_all<P: AsRef<Path>>(paths: &[P], registry: &Registry) -> Result<()> {
    for path in paths {
        SettingsDocument::load(path)?.apply(registry)?;
    }
    Ok(())
}
